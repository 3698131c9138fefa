//! Purpose: Status holder for results returned by the bound geocoding engine.
//! Exports: `ReturnCode`, `ResponseStatus`.
//! Role: Next consumer of a successfully bound library; independent of the loader.
//! Invariants: Absent return codes count as rejected.

use serde::Serialize;

const SUCCESS: &str = "00";
const WARNING: &str = "01";
const COMPASS_DIRECTION_REQUIRED: &str = "EE";

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ReturnCode {
    pub return_code: String,
    pub reason_code: Option<char>,
    pub message: Option<String>,
}

impl ReturnCode {
    pub fn new(return_code: impl Into<String>) -> Self {
        Self {
            return_code: return_code.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.return_code == SUCCESS
    }

    pub fn is_warning(&self) -> bool {
        self.return_code == WARNING
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_success() && !self.is_warning()
    }

    pub fn is_compass_direction_required(&self) -> bool {
        self.return_code == COMPASS_DIRECTION_REQUIRED
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ResponseStatus {
    pub return_code: Option<ReturnCode>,
    pub return_code_2: Option<ReturnCode>,
    pub similar_names: Vec<String>,
}

impl ResponseStatus {
    pub fn is_compass_direction_required(&self) -> bool {
        self.return_code
            .as_ref()
            .is_some_and(ReturnCode::is_compass_direction_required)
    }

    /// True only when neither return code accepted the request.
    pub fn is_rejected(&self) -> bool {
        let rejected = |code: &Option<ReturnCode>| code.as_ref().is_none_or(ReturnCode::is_rejected);
        rejected(&self.return_code) && rejected(&self.return_code_2)
    }

    pub fn similar_names_count(&self) -> usize {
        self.similar_names.len()
    }
}
