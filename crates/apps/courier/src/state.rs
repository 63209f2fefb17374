//! Shared state handed to every request handler

use mail::{CredentialStore, MailboxConnector};

use crate::enroll::Enrollment;

pub struct AppState {
    pub store: Box<dyn CredentialStore>,
    pub connector: Box<dyn MailboxConnector>,
    /// Present only when an OAuth client is configured
    pub enrollment: Option<Enrollment>,
}

impl AppState {
    pub fn new(store: Box<dyn CredentialStore>, connector: Box<dyn MailboxConnector>) -> Self {
        Self {
            store,
            connector,
            enrollment: None,
        }
    }

    pub fn with_enrollment(mut self, enrollment: Enrollment) -> Self {
        self.enrollment = Some(enrollment);
        self
    }
}
