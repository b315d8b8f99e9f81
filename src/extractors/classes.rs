// src/extractors/classes.rs

// --- Imports ---
use crate::extractors::text_of;
use crate::utils::error::ExtractError;
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use serde::Serialize;

// --- CSS Selectors (Lazy Static) ---
// One column of the weekly timetable grid
static DAY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssTtbleColDay").expect("Failed to compile DAY_SELECTOR")
});

static DAY_LABEL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssTtbleColHeaderInner span").expect("Failed to compile DAY_LABEL_SELECTOR")
});

// Class blocks, including empty filler cells
static CLASS_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".cssClassContainer").expect("Failed to compile CLASS_SELECTOR")
});

static INPUT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("input").expect("Failed to compile INPUT_SELECTOR")
});

static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div").expect("Failed to compile DIV_SELECTOR")
});

static SPAN_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span").expect("Failed to compile SPAN_SELECTOR")
});

/// Hidden inputs are named `<control path>$Hidden<Attribute>`.
const HIDDEN_MARKER: &str = "$Hidden";

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M%p"];

/// Hidden class attributes the extractor reads, keyed by the text after [`HIDDEN_MARKER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassAttr {
    ClassNo,
    StartTm,
    EndTm,
}

impl ClassAttr {
    const ALL: [ClassAttr; 3] = [ClassAttr::ClassNo, ClassAttr::StartTm, ClassAttr::EndTm];

    fn key(self) -> &'static str {
        match self {
            ClassAttr::ClassNo => "ClassNo",
            ClassAttr::StartTm => "StartTm",
            ClassAttr::EndTm => "EndTm",
        }
    }

    /// Matches the suffix after the last marker exactly, so
    /// `ctl00$A$HiddenStartTm` and `ctl00$B$HiddenStartTm` are the same attribute.
    fn from_input_name(name: &str) -> Option<Self> {
        let suffix = name.rsplit(HIDDEN_MARKER).next()?;
        Self::ALL.into_iter().find(|attr| attr.key() == suffix)
    }
}

#[derive(Debug, Default)]
struct ClassAttrs {
    class_no: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

impl ClassAttrs {
    fn collect(block: ElementRef) -> Self {
        let mut attrs = Self::default();
        for input in block.select(&INPUT_SELECTOR) {
            let (Some(name), Some(value)) = (input.value().attr("name"), input.value().attr("value")) else {
                continue;
            };
            // Later inputs override earlier ones
            match ClassAttr::from_input_name(name) {
                Some(ClassAttr::ClassNo) => attrs.class_no = Some(value.to_string()),
                Some(ClassAttr::StartTm) => attrs.start = Some(value.to_string()),
                Some(ClassAttr::EndTm) => attrs.end = Some(value.to_string()),
                None => {}
            }
        }
        attrs
    }
}

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSession {
    pub day: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub name: String,
    pub location: String,
}

impl ClassSession {
    /// The name without its trailing occurrence token: `"Lecture CRN123"` -> `"Lecture"`.
    pub fn group_key(&self) -> &str {
        match self.name.rsplit_once(char::is_whitespace) {
            Some((head, _)) => head.trim_end(),
            None => &self.name,
        }
    }
}

/// Lazily yields every class session under `root`, day by day in document order.
///
/// Blocks without a `ClassNo` hidden input are filler cells and are skipped.
/// A day without a label, a class without start/end times, or a class whose
/// label structure is not `div > div > div` holding three spans is an error.
pub fn extract_sessions<'a>(
    root: ElementRef<'a>,
) -> impl Iterator<Item = Result<ClassSession, ExtractError>> + 'a {
    root.select(&DAY_SELECTOR).flat_map(
        |day| -> Box<dyn Iterator<Item = Result<ClassSession, ExtractError>> + 'a> {
            match day_label(day) {
                Ok(day_name) => Box::new(
                    day.select(&CLASS_SELECTOR)
                        .filter_map(move |block| parse_class_block(&day_name, block).transpose()),
                ),
                Err(e) => Box::new(std::iter::once(Err(e))),
            }
        },
    )
}

fn day_label(day: ElementRef) -> Result<String, ExtractError> {
    day.select(&DAY_LABEL_SELECTOR)
        .next()
        .map(text_of)
        .ok_or_else(|| ExtractError::MissingStructure("day column has no header label".to_string()))
}

fn parse_class_block(day: &str, block: ElementRef) -> Result<Option<ClassSession>, ExtractError> {
    let attrs = ClassAttrs::collect(block);
    let Some(class_no) = attrs.class_no else {
        tracing::trace!("Skipping filler block on {}", day);
        return Ok(None);
    };

    let start = attrs.start.ok_or_else(|| {
        ExtractError::MissingStructure(format!("class {} has no {}", class_no, ClassAttr::StartTm.key()))
    })?;
    let end = attrs.end.ok_or_else(|| {
        ExtractError::MissingStructure(format!("class {} has no {}", class_no, ClassAttr::EndTm.key()))
    })?;

    // First div, its first div, its first div: holds name, separator and location
    let labels = block
        .select(&DIV_SELECTOR)
        .next()
        .and_then(|outer| outer.select(&DIV_SELECTOR).next())
        .and_then(|middle| middle.select(&DIV_SELECTOR).next())
        .ok_or_else(|| {
            ExtractError::MissingStructure(format!("class {} has no label container", class_no))
        })?;

    let spans: Vec<String> = labels.select(&SPAN_SELECTOR).map(text_of).collect();
    let [name, _separator, location] = <[String; 3]>::try_from(spans).map_err(|spans| {
        ExtractError::MissingStructure(format!(
            "class {} has {} labels, expected 3",
            class_no,
            spans.len()
        ))
    })?;

    let session = ClassSession {
        day: day.to_string(),
        start: parse_time(&start)?,
        end: parse_time(&end)?,
        name,
        location,
    };
    tracing::trace!("Class {} -> {:?}", class_no, session);
    Ok(Some(session))
}

fn parse_time(text: &str) -> Result<NaiveTime, ExtractError> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .ok_or_else(|| ExtractError::InvalidTime(text.to_string()))
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn block(class_no: Option<&str>, start: &str, end: &str, name: &str, location: &str) -> String {
        let class_no = class_no
            .map(|n| format!(r#"<input type="hidden" name="ctl00$Content$ctlTimetable$r1$HiddenClassNo" value="{n}" />"#))
            .unwrap_or_default();
        format!(
            r#"<div class="cssClassContainer">
                 {class_no}
                 <input type="hidden" name="ctl00$Content$ctlTimetable$r1$HiddenStartTm" value="{start}" />
                 <input type="hidden" name="ctl00$Content$ctlTimetableOther$HiddenEndTm" value="{end}" />
                 <div><div><div>
                   <span>{name}</span><span>-</span><span>{location}</span>
                 </div></div></div>
               </div>"#
        )
    }

    fn day(label: &str, blocks: &[String]) -> String {
        format!(
            r#"<div class="cssTtbleColDay">
                 <div class="cssTtbleColHeaderInner"><span> {label} </span></div>
                 {}
               </div>"#,
            blocks.concat()
        )
    }

    fn sessions(html: &str) -> Result<Vec<ClassSession>, ExtractError> {
        let document = Html::parse_document(html);
        let result = extract_sessions(document.root_element()).collect();
        result
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_sessions_follow_document_order() {
        let html = [
            day(
                "Monday",
                &[
                    block(Some("1"), "08:00:00", "10:00:00", "Lecture CRN123", " 210.101 "),
                    block(Some("2"), "13:30:00", "15:00:00", "Workshop 02", "314.220"),
                ],
            ),
            day("Tuesday", &[block(Some("3"), "9:00", "10:00", "Lecture CRN456", "210.101")]),
        ]
        .concat();

        let found = sessions(&html).unwrap();

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].day, "Monday");
        assert_eq!(found[0].start, time(8, 0));
        assert_eq!(found[0].end, time(10, 0));
        assert_eq!(found[0].name, "Lecture CRN123");
        assert_eq!(found[0].location, "210.101");
        assert_eq!(found[1].start, time(13, 30));
        assert_eq!(found[2].day, "Tuesday");
        assert_eq!(found[2].start, time(9, 0));
    }

    #[test]
    fn test_block_without_class_no_is_skipped() {
        let html = day(
            "Wednesday",
            &[
                block(None, "", "", "", ""),
                block(Some("7"), "11:00:00", "12:00:00", "Tutorial 01", "401.101"),
            ],
        );

        let found = sessions(&html).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Tutorial 01");
    }

    #[test]
    fn test_attribute_suffix_must_match_exactly() {
        assert_eq!(ClassAttr::from_input_name("a$b$HiddenClassNo"), Some(ClassAttr::ClassNo));
        assert_eq!(ClassAttr::from_input_name("x$HiddenFoo$HiddenEndTm"), Some(ClassAttr::EndTm));
        assert_eq!(ClassAttr::from_input_name("ClassNo"), Some(ClassAttr::ClassNo));
        assert_eq!(ClassAttr::from_input_name("a$HiddenClassNoExtra"), None);
        assert_eq!(ClassAttr::from_input_name("a$HiddenDescription"), None);
    }

    #[test]
    fn test_missing_labels_is_a_structure_error() {
        let html = day(
            "Thursday",
            &[r#"<div class="cssClassContainer">
                   <input type="hidden" name="x$HiddenClassNo" value="9" />
                   <input type="hidden" name="x$HiddenStartTm" value="10:00:00" />
                   <input type="hidden" name="x$HiddenEndTm" value="11:00:00" />
                   <div><div><div><span>Lab 01</span></div></div></div>
                 </div>"#
                .to_string()],
        );

        assert!(matches!(sessions(&html), Err(ExtractError::MissingStructure(_))));
    }

    #[test]
    fn test_bad_time_is_rejected() {
        let html = day("Friday", &[block(Some("4"), "noon", "13:00:00", "Lab 01", "101")]);
        assert!(matches!(sessions(&html), Err(ExtractError::InvalidTime(_))));
    }

    #[test]
    fn test_day_without_label_is_a_structure_error() {
        let html = r#"<div class="cssTtbleColDay"><div class="cssClassContainer"></div></div>"#;
        assert!(matches!(sessions(html), Err(ExtractError::MissingStructure(_))));
    }

    #[test]
    fn test_group_key_strips_last_token() {
        let mut session = ClassSession {
            day: "Monday".to_string(),
            start: time(8, 0),
            end: time(9, 0),
            name: "Lecture CRN123".to_string(),
            location: String::new(),
        };
        assert_eq!(session.group_key(), "Lecture");

        session.name = "Computer Lab 12".to_string();
        assert_eq!(session.group_key(), "Computer Lab");

        session.name = "Seminar".to_string();
        assert_eq!(session.group_key(), "Seminar");
    }
}
