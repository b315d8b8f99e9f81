// src/timetable/mod.rs
pub mod aggregate;

use crate::portal::{Browser, Navigator};
use crate::utils::error::{PortalError, TransportError};
use url::Url;

pub use aggregate::{aggregate, group_sessions, ClassGroups, Unit, UnitSchedules};

pub const DEFAULT_BASE_URL: &str = "https://estudent.curtin.edu.au/eStudent/";

const STUDENT_TIMETABLE_PATH: &str = "SM/StudentTtable10.aspx";
const TIMETABLE_PARAMS: [(&str, &str); 2] = [("r", "#CU.ESTU.STUDENT"), ("f", "#CU.EST.TIMETBL.WEB")];

/// The study period drop-down of the timetable filter.
pub const STUDY_PERIOD_FIELD: &str = "ctl00$Content$ctlFilter$CboStudyPeriodFilter$elbList";

/// The button that lists the units of the selected study period.
pub const SEARCH_CONTROL: &str = "ctl00$Content$ctlFilter$BtnSearch";

/// Opens the student timetable page, whose form carries the study period filter.
pub fn open_timetable<B: Browser>(navigator: &mut Navigator<B>, base_url: &str) -> Result<(), PortalError> {
    tracing::info!("Opening student timetable at {}", base_url);
    navigator.open(base_url, &[])?;

    let timetable_url = Url::parse(base_url)
        .and_then(|base| base.join(STUDENT_TIMETABLE_PATH))
        .map_err(TransportError::from)?;
    navigator.open(timetable_url.as_str(), &TIMETABLE_PARAMS)?;

    // The page must offer the filter before anything is submitted
    navigator.form()?.options(STUDY_PERIOD_FIELD)?;
    Ok(())
}

/// Every study period the filter offers, in the order listed.
pub fn study_periods<B: Browser>(navigator: &Navigator<B>) -> Result<Vec<String>, PortalError> {
    Ok(navigator.form()?.options(STUDY_PERIOD_FIELD)?.to_vec())
}
