//! HTML bodies for delivery and failure-notification emails.

pub const REPORT_SUBJECT: &str = "Your Export Report";
pub const FAILURE_SUBJECT: &str = "Export Report Failed";

pub fn report_body(title: &str) -> String {
    format!(
        "<html><body>\
         <p>Hi,</p>\
         <p>Your <strong>{title}</strong> report is attached.</p>\
         <p>This report was generated automatically from the latest \
         available data.</p>\
         </body></html>"
    )
}

pub fn failure_body(use_case: &str, reason: &str) -> String {
    format!(
        "<html><body>\
         <p>Hi,</p>\
         <p>We could not generate your <strong>{use_case}</strong> report.</p>\
         <p>Reason: {reason}</p>\
         <p>The request was retried automatically before giving up. Please \
         try again later or contact the team if the problem persists.</p>\
         </body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_body_names_the_report() {
        let body = report_body("Political Snapshot");
        assert!(body.contains("Political Snapshot"));
        assert!(body.contains("attached"));
    }

    #[test]
    fn failure_body_names_use_case_and_reason() {
        let body = failure_body("POLITICAL_SNAPSHOT", "No view data was successfully fetched");
        assert!(body.contains("POLITICAL_SNAPSHOT"));
        assert!(body.contains("No view data was successfully fetched"));
    }
}
