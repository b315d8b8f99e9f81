// src/timetable/aggregate.rs
use std::collections::VecDeque;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use scraper::Selector;
use serde::Serialize;

use crate::extractors::{extract_sessions, text_of, ClassSession};
use crate::portal::{Browser, Navigator, Page};
use crate::timetable::{SEARCH_CONTROL, STUDY_PERIOD_FIELD};
use crate::utils::error::{ExtractError, PortalError};

// --- CSS Selectors (Lazy Static) ---
static UNIT_CONTAINER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssTtableSspNavMasterContainer").expect("Failed to compile UNIT_CONTAINER_SELECTOR")
});

static UNIT_CODE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssTtableSspNavMasterSpkInfo2 div span").expect("Failed to compile UNIT_CODE_SELECTOR")
});

static UNIT_NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssTtableSspNavMasterSpkInfo3 div").expect("Failed to compile UNIT_NAME_SELECTOR")
});

// The "view timetable" button of a unit
static UNIT_ACTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssTtableSspNavMasterAction input").expect("Failed to compile UNIT_ACTION_SELECTOR")
});

// --- Data Structures ---

/// Class sessions grouped by [`ClassSession::group_key`], in order of first appearance.
///
/// Serialises as a JSON object in that same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassGroups(IndexMap<String, Vec<ClassSession>>);

impl ClassGroups {
    pub fn get(&self, key: &str) -> Option<&[ClassSession]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ClassSession])> {
        self.0.iter().map(|(key, sessions)| (key.as_str(), sessions.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collates sessions under their group key. Sessions sharing a key keep their relative order.
pub fn group_sessions(sessions: impl IntoIterator<Item = ClassSession>) -> ClassGroups {
    let mut groups: IndexMap<String, Vec<ClassSession>> = IndexMap::new();
    for session in sessions {
        groups.entry(session.group_key().to_string()).or_default().push(session);
    }
    ClassGroups(groups)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub study_period: String,
    pub unit_code: String,
    pub unit_name: String,
    pub classes: ClassGroups,
}

/// What the unit list shows for one unit, read before drilling into it.
#[derive(Debug, Clone)]
struct UnitHeader {
    code: String,
    name: String,
    control: String,
}

fn unit_headers(page: &Page) -> Result<Vec<UnitHeader>, ExtractError> {
    let mut headers = Vec::new();
    for container in page.select(&UNIT_CONTAINER_SELECTOR) {
        let code = container
            .select(&UNIT_CODE_SELECTOR)
            .next()
            .map(text_of)
            .ok_or_else(|| ExtractError::MissingStructure("unit container has no unit code".to_string()))?;
        let name = container
            .select(&UNIT_NAME_SELECTOR)
            .next()
            .map(text_of)
            .ok_or_else(|| ExtractError::MissingStructure(format!("unit {} has no name", code)))?;
        let mut buttons = container
            .select(&UNIT_ACTION_SELECTOR)
            .filter_map(|input| input.value().attr("name"));
        let control = match (buttons.next(), buttons.next()) {
            (Some(name), None) => name.to_string(),
            (None, _) => {
                return Err(ExtractError::MissingStructure(format!("unit {} has no timetable button", code)));
            }
            (Some(_), Some(_)) => {
                return Err(ExtractError::MissingStructure(format!(
                    "unit {} has more than one timetable button",
                    code
                )));
            }
        };

        headers.push(UnitHeader { code, name, control });
    }
    Ok(headers)
}

/// Walks the timetable of every requested study period, one unit at a time.
///
/// Every period is checked against the filter's options before anything is
/// submitted; one unknown period fails the whole batch with
/// [`PortalError::InvalidStudyPeriod`]. The navigator must be on the timetable
/// page (see [`crate::timetable::open_timetable`]).
pub fn aggregate<'n, B, I>(study_periods: I, navigator: &'n mut Navigator<B>) -> Result<UnitSchedules<'n, B>, PortalError>
where
    B: Browser,
    I: IntoIterator,
    I::Item: Into<String>,
{
    let periods: Vec<String> = study_periods.into_iter().map(Into::into).collect();

    let options = navigator.form()?.options(STUDY_PERIOD_FIELD)?;
    if let Some(invalid) = periods.iter().find(|p| !options.contains(p)) {
        tracing::warn!("Study period '{}' not in {:?}", invalid, options);
        return Err(PortalError::InvalidStudyPeriod(invalid.clone()));
    }

    tracing::info!("Aggregating {} study period(s)", periods.len());
    Ok(UnitSchedules {
        navigator,
        periods: periods.into_iter(),
        pending: VecDeque::new(),
        period: None,
        failed: false,
    })
}

/// Lazy sequence of [`Unit`]s produced by [`aggregate`].
///
/// While a period's unit list is open the search submission is an open frame
/// on the navigator; it is navigated back from once the period's units are
/// exhausted, on the first error, or when the sequence is dropped early.
pub struct UnitSchedules<'n, B: Browser> {
    navigator: &'n mut Navigator<B>,
    periods: std::vec::IntoIter<String>,
    pending: VecDeque<UnitHeader>,
    period: Option<String>,
    failed: bool,
}

impl<'n, B: Browser> UnitSchedules<'n, B> {
    fn advance(&mut self) -> Result<Option<Unit>, PortalError> {
        loop {
            if let Some(header) = self.pending.pop_front() {
                return self.visit_unit(header).map(Some);
            }

            self.close_period()?;
            let Some(period) = self.periods.next() else {
                return Ok(None);
            };
            self.open_period(period)?;
        }
    }

    fn open_period(&mut self, period: String) -> Result<(), PortalError> {
        tracing::info!("Searching study period '{}'", period);
        self.navigator.form_mut()?.set(STUDY_PERIOD_FIELD, &period)?;
        self.navigator.push_frame(SEARCH_CONTROL)?;
        self.period = Some(period);

        let headers = unit_headers(self.navigator.page()?)?;
        tracing::info!("Found {} unit(s)", headers.len());
        self.pending.extend(headers);
        Ok(())
    }

    fn close_period(&mut self) -> Result<(), PortalError> {
        if self.period.take().is_some() {
            self.pending.clear();
            self.navigator.pop_frame()?;
        }
        Ok(())
    }

    fn visit_unit(&mut self, header: UnitHeader) -> Result<Unit, PortalError> {
        tracing::info!("Reading timetable for {} {}", header.code, header.name);
        let study_period = self.period.clone().unwrap_or_default();

        let scope = self.navigator.submit(&header.control)?;
        let sessions = extract_sessions(scope.page()?.html().root_element())
            .collect::<Result<Vec<ClassSession>, ExtractError>>()?;
        scope.close()?;

        tracing::debug!("{}: {} session(s)", header.code, sessions.len());
        Ok(Unit {
            study_period,
            unit_code: header.code,
            unit_name: header.name,
            classes: group_sessions(sessions),
        })
    }
}

impl<'n, B: Browser> Iterator for UnitSchedules<'n, B> {
    type Item = Result<Unit, PortalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.advance() {
            Ok(unit) => unit.map(Ok),
            Err(e) => {
                // A failed traversal ends the sequence
                self.failed = true;
                if let Err(back) = self.close_period() {
                    tracing::error!("Failed to leave unit list after error: {}", back);
                }
                Some(Err(e))
            }
        }
    }
}

impl<B: Browser> Drop for UnitSchedules<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.close_period() {
            tracing::error!("Failed to leave unit list: {}", e);
        }
    }
}
