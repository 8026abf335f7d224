use serde::Serialize;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use super::aggregate::MonthlyStat;

pub const DEFAULTER_BELOW: u8 = 75;
pub const EXCELLENT_ABOVE: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[strum(serialize = "<75%")]
    Defaulter,
    #[strum(serialize = "75-90%")]
    MidRange,
    #[strum(serialize = "91-100%")]
    Excellent,
}

impl Tier {
    pub fn of(percentage: u8) -> Self {
        if percentage < DEFAULTER_BELOW {
            Tier::Defaulter
        } else if percentage <= EXCELLENT_ABOVE {
            Tier::MidRange
        } else {
            Tier::Excellent
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TierSummary {
    pub defaulters: u32,
    pub mid_range: u32,
    pub excellent: u32,
}

impl TierSummary {
    pub fn total(&self) -> u32 {
        self.defaulters + self.mid_range + self.excellent
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct Classification {
    pub defaulters: Vec<MonthlyStat>,
    pub mid_range: Vec<MonthlyStat>,
    pub excellent: Vec<MonthlyStat>,
}

impl Classification {
    pub fn summary(&self) -> TierSummary {
        TierSummary {
            defaulters: self.defaulters.len() as u32,
            mid_range: self.mid_range.len() as u32,
            excellent: self.excellent.len() as u32,
        }
    }
}

pub fn classify(stats: &[MonthlyStat]) -> Classification {
    let mut out = Classification::default();
    for stat in stats {
        let bucket = match Tier::of(stat.percentage) {
            Tier::Defaulter => &mut out.defaulters,
            Tier::MidRange => &mut out.mid_range,
            Tier::Excellent => &mut out.excellent,
        };
        bucket.push(stat.clone());
    }
    out
}

pub fn defaulters(stats: &[MonthlyStat]) -> Vec<&MonthlyStat> {
    stats
        .iter()
        .filter(|s| Tier::of(s.percentage) == Tier::Defaulter)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stat(name: &str, percentage: u8) -> MonthlyStat {
        MonthlyStat {
            student_name: name.to_string(),
            rfid_uid: name.to_lowercase(),
            present: percentage as u32,
            total: 100,
            percentage,
        }
    }

    #[test]
    fn boundaries_follow_fixed_thresholds() {
        assert_eq!(Tier::of(0), Tier::Defaulter);
        assert_eq!(Tier::of(74), Tier::Defaulter);
        assert_eq!(Tier::of(75), Tier::MidRange);
        assert_eq!(Tier::of(90), Tier::MidRange);
        assert_eq!(Tier::of(91), Tier::Excellent);
        assert_eq!(Tier::of(100), Tier::Excellent);
    }

    #[test]
    fn labels_match_dashboard_legend() {
        assert_eq!(Tier::Defaulter.to_string(), "<75%");
        assert_eq!(Tier::MidRange.as_ref(), "75-90%");
        assert_eq!(Tier::Excellent.to_string(), "91-100%");
    }

    #[test]
    fn classify_buckets_members() {
        let stats = vec![stat("Asha", 74), stat("Bela", 75), stat("Chirag", 90), stat("Dev", 91)];
        let c = classify(&stats);

        assert_eq!(c.defaulters, vec![stat("Asha", 74)]);
        assert_eq!(c.mid_range.len(), 2);
        assert_eq!(c.excellent[0].student_name, "Dev");
        assert_eq!(
            c.summary(),
            TierSummary {
                defaulters: 1,
                mid_range: 2,
                excellent: 1
            }
        );
    }

    #[test]
    fn defaulters_keeps_order() {
        let stats = vec![stat("Zed", 10), stat("Bela", 80), stat("Asha", 60)];
        let names: Vec<_> = defaulters(&stats).iter().map(|s| s.student_name.as_str()).collect();
        assert_eq!(names, ["Zed", "Asha"]);
    }

    proptest! {
        #[test]
        fn partition_covers_every_student_once(pcts in proptest::collection::vec(0u8..=100, 0..60)) {
            let stats: Vec<_> = pcts.iter().enumerate().map(|(i, p)| stat(&format!("S{i}"), *p)).collect();
            let c = classify(&stats);

            prop_assert_eq!(c.summary().total() as usize, stats.len());
            for s in &c.defaulters {
                prop_assert!(!c.mid_range.contains(s) && !c.excellent.contains(s));
            }
            for s in &c.mid_range {
                prop_assert!(!c.excellent.contains(s));
            }
        }
    }
}
