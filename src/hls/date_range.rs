use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Serialize;

use super::attr_list::AttrList;
use crate::Result;

/// `CLASS` value marking an interstitial date range.
pub const INTERSTITIAL_CLASS: &str = "com.apple.hls.interstitial";

/// Parse an ISO 8601 / RFC 3339 timestamp. Values without a zone are UTC.
pub fn parse_date_time(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    Ok(NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")?.and_utc())
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis(date: &DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64
}

/// Interstitial `CUE` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRangeCue {
    pub pre: bool,
    pub post: bool,
    pub once: bool,
}

/// An `EXT-X-DATERANGE` record, merged across tags sharing one ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub id: String,
    pub class: Option<String>,
    pub attr: AttrList,
    /// Order in which the ID was first seen in the playlist.
    pub tag_order: usize,
    /// Sequence number of the fragment the range is mapped to.
    pub tag_anchor: Option<u64>,
    /// Seconds on the playlist timeline, set once the range is anchored.
    pub start_time: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub planned_duration: Option<f64>,
    pub end_on_next: bool,
    pub cue: DateRangeCue,
    pub is_interstitial: bool,
    pub is_valid: bool,
}

impl DateRange {
    /// Build a record from one tag, merging onto `previous` when the ID was
    /// already seen. `tag_count` is the number of DATERANGE tags before this one.
    pub fn new(attr: AttrList, previous: Option<&DateRange>, tag_count: usize) -> Self {
        let mut conflict = None;
        let attr = match previous {
            Some(previous) => {
                conflict = previous
                    .attr
                    .iter()
                    .find(|(name, value)| attr.get(name).is_some_and(|v| v != *value))
                    .map(|(name, _)| name.to_string());
                if let Some(name) = &conflict {
                    tracing::warn!(
                        "DATERANGE tag attribute: \"{}\" does not match for tags with ID: \"{}\"",
                        name,
                        attr.get("ID").unwrap_or_default()
                    );
                }
                let mut merged = previous.attr.clone();
                for (name, value) in attr.iter() {
                    merged.insert(name, value);
                }
                merged
            }
            None => attr,
        };

        let start_date = match previous {
            Some(previous) => previous.start_date,
            None => attr.get("START-DATE").and_then(|d| parse_date_time(d).ok()),
        };
        let explicit_end = if attr.contains("END-DATE") {
            previous
                .and_then(|p| p.end_date)
                .or_else(|| attr.get("END-DATE").and_then(|d| parse_date_time(d).ok()))
        } else {
            None
        };
        let duration = if attr.contains("DURATION") {
            attr.decimal_floating_point("DURATION")
        } else {
            match (start_date, explicit_end) {
                (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
                _ => None,
            }
        };
        let end_date = explicit_end.or_else(|| {
            let start = start_date?;
            let seconds = duration.filter(|d| d.is_finite() && *d >= 0.0)?;
            let delta = TimeDelta::try_milliseconds((seconds * 1000.0).round() as i64)?;
            start.checked_add_signed(delta)
        });

        let cue_attr = if attr.contains("CUE") { "CUE" } else { "X-CUE" };
        let mut cue = DateRangeCue::default();
        for flag in attr.enumerated_string_list(cue_attr) {
            match flag.as_str() {
                "pre" => cue.pre = true,
                "post" => cue.post = true,
                "once" => cue.once = true,
                _ => {}
            }
        }

        let id = attr.get("ID").unwrap_or_default().to_string();
        let class = attr.get("CLASS").map(str::to_string);
        let end_on_next = attr.bool("END-ON-NEXT");
        let is_interstitial = class.as_deref() == Some(INTERSTITIAL_CLASS);
        let is_valid = !id.is_empty()
            && conflict.is_none()
            && start_date.is_some()
            && duration.is_none_or(|d| d >= 0.0)
            && (!end_on_next || class.is_some())
            && (!attr.contains("CUE") || !(cue.pre && cue.post))
            && (!is_interstitial || attr.contains("X-ASSET-URI") || attr.contains("X-ASSET-LIST"));

        Self {
            id,
            class,
            tag_order: previous.map_or(tag_count, |p| p.tag_order),
            tag_anchor: previous.and_then(|p| p.tag_anchor),
            start_time: previous.and_then(|p| p.start_time),
            planned_duration: attr.decimal_floating_point("PLANNED-DURATION"),
            attr,
            start_date,
            end_date,
            duration,
            end_on_next,
            cue,
            is_interstitial,
            is_valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(attrs: &str) -> DateRange {
        DateRange::new(AttrList::parse(attrs), None, 0)
    }

    #[test]
    fn test_parse_date_time() {
        let dt = parse_date_time("2016-05-27T16:34:44Z").unwrap();
        assert_eq!(epoch_millis(&dt), 1464366884000.0);
        let dt = parse_date_time("2021-11-10T03:25:49.015Z").unwrap();
        assert_eq!(dt.timestamp_millis() % 1000, 15);
        let dt = parse_date_time("2016-05-27T16:34:44+0000").unwrap();
        assert_eq!(epoch_millis(&dt), 1464366884000.0);
        let dt = parse_date_time("2016-05-27T16:34:44").unwrap();
        assert_eq!(epoch_millis(&dt), 1464366884000.0);
        assert!(parse_date_time("foo").is_err());
    }

    #[test]
    fn test_interstitial_cue() {
        let r = range(
            r#"ID="post",CLASS="com.apple.hls.interstitial",CUE="POST,ONCE",START-DATE="2024-01-12T10:00:00.000Z",DURATION=15.0,X-ASSET-URI="e.m3u8""#,
        );
        assert!(r.is_interstitial);
        assert_eq!(r.cue, DateRangeCue { pre: false, post: true, once: true });
        assert_eq!(r.duration, Some(15.0));
        assert!(r.is_valid);
        let end = r.end_date.unwrap();
        assert_eq!((end - r.start_date.unwrap()).num_seconds(), 15);
    }

    #[test]
    fn test_validity_rules() {
        assert!(!range(r#"START-DATE="2024-01-12T10:00:00Z""#).is_valid);
        assert!(!range(r#"ID="a",START-DATE="nope""#).is_valid);
        assert!(!range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z",DURATION=-1"#).is_valid);
        assert!(!range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z",END-ON-NEXT=YES"#).is_valid);
        assert!(!range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z",CUE="PRE,POST""#).is_valid);
        assert!(
            !range(r#"ID="a",CLASS="com.apple.hls.interstitial",START-DATE="2024-01-12T10:00:00Z""#)
                .is_valid
        );
        assert!(range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z""#).is_valid);
    }

    #[test]
    fn test_duration_from_end_date() {
        let r = range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z",END-DATE="2024-01-12T10:00:30Z""#);
        assert_eq!(r.duration, Some(30.0));
    }

    #[test]
    fn test_out_of_range_duration_has_no_end_date() {
        let r = range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z",DURATION=-1e300"#);
        assert!(!r.is_valid);
        assert_eq!(r.end_date, None);

        let r = range(r#"ID="a",START-DATE="2024-01-12T10:00:00Z",DURATION=1e300"#);
        assert!(r.is_valid);
        assert_eq!(r.end_date, None);
    }

    #[test]
    fn test_merge_same_id() {
        let first = DateRange::new(
            AttrList::parse(r#"ID="ad",START-DATE="2018-09-28T16:50:48Z",PLANNED-DURATION=20.0"#),
            None,
            3,
        );
        let second = DateRange::new(AttrList::parse(r#"ID="ad",DURATION=30.0"#), Some(&first), 5);
        assert_eq!(second.tag_order, 3);
        assert_eq!(second.duration, Some(30.0));
        assert_eq!(second.planned_duration, Some(20.0));
        assert_eq!(second.start_date, first.start_date);
        assert!(second.is_valid);

        let conflicting = DateRange::new(
            AttrList::parse(r#"ID="ad",START-DATE="2018-09-28T16:51:18Z""#),
            Some(&first),
            6,
        );
        assert!(!conflicting.is_valid);
    }
}
