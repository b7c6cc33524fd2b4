// src/exam/flow.rs

//! Page flow of the exam portal as an explicit state machine.

use serde::Serialize;

use crate::error::ExamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Login,
    StudentHome,
    Exam,
    AdminPanel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ProceedAsStudent,
    AdminAuthenticated,
    StartExam,
    Submit,
    /// The countdown ran out.
    Expire,
    Logout,
}

impl Page {
    /// Page reached by applying `event` on this page.
    pub fn on(self, event: Event) -> Result<Page, ExamError> {
        match (self, event) {
            (Page::Login, Event::ProceedAsStudent) => Ok(Page::StudentHome),
            (Page::Login, Event::AdminAuthenticated) => Ok(Page::AdminPanel),
            (Page::StudentHome, Event::StartExam) => Ok(Page::Exam),
            (Page::Exam, Event::Submit | Event::Expire) => Ok(Page::StudentHome),
            (Page::StudentHome | Page::AdminPanel, Event::Logout) => Ok(Page::Login),
            (from, event) => Err(ExamError::InvalidTransition { from, event }),
        }
    }
}
