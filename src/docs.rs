use crate::analytics::aggregate::{AttendanceSummary, MonthlyStat, PeriodStats, RosterCoverage};
use crate::analytics::classify::{Classification, Tier, TierSummary};
use crate::api::analytics::{MonthlyOverview, StudentBreakdown, TierSlice};
use crate::api::attendance::{LogListResponse, MyAttendance};
use crate::api::selfie::{SelfieReceipt, SelfieUpload};
use crate::api::students::{EnrollStudent, StudentListResponse};
use crate::model::attendance::AttendanceLog;
use crate::model::student::Student;
use crate::models::{LoginResponse, StudentLoginDto, TeacherLoginDto};
use crate::report::{
    DailyReport, DailyRow, DailySummary, DayStatus, DefaulterReport, DefaulterRow, MonthlyReport,
    MonthlyRow, export::ExportFormat,
};
use crate::selfie::caption::OverlayCaption;
use crate::selfie::window::SelfieWindowState;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendify API",
        version = "1.0.0",
        description = r#"
## RFID Attendance Dashboard

Backend for a classroom attendance system. RFID readers write check-in and
check-out rows; this API turns them into dashboards and reports.

### Key Features
- **Attendance**
  - Daily class table, raw logs and a live event stream
- **Analytics**
  - Monthly class percentages, per-student stats and attendance tiers
- **Selfie verification**
  - Geotagged selfie within 10 minutes of check-in
- **Reports**
  - Daily report, monthly report and defaulter list (below 75%)

### Security
Endpoints under `/api` require a **JWT Bearer** access token. Teacher and
student roles see different endpoints.
"#,
    ),
    paths(
        crate::auth::handlers::student_login,
        crate::auth::handlers::teacher_login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::students::list_students,
        crate::api::students::enroll_student,
        crate::api::students::me,

        crate::api::attendance::daily_table,
        crate::api::attendance::list_logs,
        crate::api::attendance::my_attendance,
        crate::api::live::live,

        crate::api::analytics::monthly,
        crate::api::analytics::daily,
        crate::api::analytics::students,

        crate::api::selfie::window,
        crate::api::selfie::upload,
        crate::api::selfie::photo,

        crate::api::reports::daily,
        crate::api::reports::monthly,
        crate::api::reports::defaulters
    ),
    components(
        schemas(
            StudentLoginDto,
            TeacherLoginDto,
            LoginResponse,
            Student,
            EnrollStudent,
            StudentListResponse,
            AttendanceLog,
            LogListResponse,
            AttendanceSummary,
            MyAttendance,
            PeriodStats,
            RosterCoverage,
            MonthlyOverview,
            MonthlyStat,
            Tier,
            TierSummary,
            Classification,
            TierSlice,
            StudentBreakdown,
            SelfieWindowState,
            SelfieUpload,
            SelfieReceipt,
            OverlayCaption,
            DayStatus,
            DailyRow,
            DailySummary,
            DailyReport,
            MonthlyRow,
            MonthlyReport,
            DefaulterRow,
            DefaulterReport,
            ExportFormat
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Students", description = "Roster and enrollment"),
        (name = "Attendance", description = "Attendance tables, logs and live updates"),
        (name = "Analytics", description = "Attendance percentages and tiers"),
        (name = "Selfie", description = "Post check-in selfie verification"),
        (name = "Reports", description = "Export-ready report records"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/auth/teacher/login",
            "/api/students/me",
            "/api/attendance/live",
            "/api/analytics/students",
            "/api/selfie",
            "/photos/selfies/{file}",
            "/api/reports/defaulters",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }

        let schemes = doc.components.map(|c| c.security_schemes).unwrap_or_default();
        assert!(schemes.contains_key("bearer_auth"));
    }
}
