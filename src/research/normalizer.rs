//! Response normalization for the research webhook.
//!
//! The webhook's output shape has drifted across versions: sometimes a bare
//! object, sometimes an array, sometimes JSON re-encoded as a string (once
//! or twice), sometimes entries grouped under category keys, sometimes led
//! by a debrief record in one of several shapes. This module turns any of
//! those (or outright garbage) into a flat batch of entries plus an
//! optional debrief.
//!
//! The contract with the upstream system is "render best effort, never
//! crash": normalization is total. Unusable input degrades to a single
//! placeholder entry rather than an error.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::research::ids::EntryIdGen;
use crate::types::{Debrief, ResearchEntry, DEFAULT_CATEGORY, NO_LINK};

/// How many levels of string-encoded JSON to peel from a value.
const MAX_PEEL_DEPTH: usize = 2;

/// Keys that mark an object as a direct-shape entry rather than a
/// category-grouped container.
const DIRECT_ENTRY_KEYS: &[&str] = &["title", "summary", "url", "category", "postedDate"];

/// The outcome of normalizing one response body.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub debrief: Option<Debrief>,
    pub entries: Vec<ResearchEntry>,
}

/// Normalize a raw response body into a batch.
///
/// `company` stamps every produced entry; `ids` mints entry IDs. Dedup by
/// URL happens inside this one batch only; collisions with previously
/// accumulated entries are left alone.
pub fn normalize(company: &str, body: &str, ids: &EntryIdGen) -> NormalizedBatch {
    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("research response is not JSON ({}); treating as empty", e);
            Value::Null
        }
    };

    let mut items = working_list(parsed);
    let debrief = extract_debrief(&mut items);

    let mut entries = Vec::new();
    for item in items {
        collect_entries(company, item, ids, &mut entries);
    }
    let entries = dedup_by_url(entries);

    if entries.is_empty() && debrief.is_none() {
        log::info!("research response for '{}' yielded nothing usable", company);
        return NormalizedBatch {
            debrief: None,
            entries: vec![placeholder_entry(company, ids)],
        };
    }

    NormalizedBatch { debrief, entries }
}

/// Top-level shape handling: arrays as-is, a bare object wrapped as a
/// single-element list, anything else (scalars, null, parse failures)
/// treated as empty.
fn working_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

/// Peel up to [`MAX_PEEL_DEPTH`] levels of JSON that the upstream system
/// re-encoded as a string.
fn peel(mut value: Value) -> Value {
    for _ in 0..MAX_PEEL_DEPTH {
        match value {
            Value::String(ref s) => match serde_json::from_str::<Value>(s) {
                Ok(inner) => value = inner,
                Err(_) => break,
            },
            _ => break,
        }
    }
    value
}

// ---------------------------------------------------------------------------
// Debrief extraction
// ---------------------------------------------------------------------------

/// Debrief markers across the historical shapes. A bare `title` is
/// deliberately not enough: the first element of a plain article list also
/// has a title, and must stay an article.
fn is_debrief_shape(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => {
            obj.contains_key("fullBody")
                || obj.contains_key("bulletPoints")
                || obj.contains_key("supporting_points")
        }
        None => false,
    }
}

/// Pop the first element as a debrief if it matches a debrief shape.
/// Consumes exactly the first element, never more.
fn extract_debrief(items: &mut Vec<Value>) -> Option<Debrief> {
    let first = peel(items.first()?.clone());
    if !is_debrief_shape(&first) {
        return None;
    }
    items.remove(0);

    first.as_object().map(build_debrief)
}

fn build_debrief(obj: &Map<String, Value>) -> Debrief {
    let title = non_blank_str(obj.get("title")).unwrap_or_else(|| "Content Debrief".to_string());
    let full_body = non_blank_str(obj.get("fullBody"));

    let mut raw_bullets = string_array(obj.get("bulletPoints"));
    if raw_bullets.is_empty() {
        raw_bullets = string_array(obj.get("supporting_points"));
    }
    if raw_bullets.is_empty() {
        if let Some(body) = &full_body {
            raw_bullets = body
                .lines()
                .map(str::trim)
                .filter(|line| line.starts_with('-') || line.starts_with('•'))
                .map(str::to_string)
                .collect();
        }
    }
    let bullet_points: Vec<String> = raw_bullets
        .iter()
        .map(|b| clean_bullet(b))
        .filter(|b| !b.is_empty())
        .collect();

    let executive_summary = non_blank_str(obj.get("executive_summary"))
        .or_else(|| non_blank_str(obj.get("executiveSummary")))
        .or_else(|| full_body.as_deref().and_then(derive_executive_summary))
        .or_else(|| {
            if bullet_points.is_empty() {
                None
            } else {
                Some(
                    bullet_points
                        .iter()
                        .take(3)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(" "),
                )
            }
        });

    let totals = obj.get("totals").and_then(Value::as_object).map(|map| {
        map.iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
            .collect::<HashMap<String, f64>>()
    });

    Debrief {
        title,
        executive_summary,
        full_body,
        bullet_points,
        totals,
        bullet_point_count: obj.get("bulletPointCount").and_then(Value::as_u64),
    }
}

/// Join the prose lines of a markdown-ish body into one paragraph, skipping
/// headings and bullet lines.
fn derive_executive_summary(body: &str) -> Option<String> {
    let prose: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with('-')
                && !line.starts_with('•')
        })
        .collect();

    if prose.is_empty() {
        None
    } else {
        Some(prose.join(" "))
    }
}

/// Strip a leading bullet marker and surrounding bold markers.
fn clean_bullet(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix('-').or_else(|| s.strip_prefix('•')) {
        s = rest.trim();
    }
    if s.starts_with("**") && s.ends_with("**") && s.len() >= 4 {
        s = s[2..s.len() - 2].trim();
    }
    s.to_string()
}

// ---------------------------------------------------------------------------
// Entry extraction
// ---------------------------------------------------------------------------

fn is_direct_shape(obj: &Map<String, Value>) -> bool {
    DIRECT_ENTRY_KEYS.iter().any(|key| obj.contains_key(*key))
}

/// Extract every candidate entry from one working-list element.
///
/// Direct-shape objects contribute one candidate. Anything else is read as
/// a grouped object: each key is a category label whose value holds one
/// entry or a list of them, possibly re-encoded as strings.
fn collect_entries(company: &str, item: Value, ids: &EntryIdGen, out: &mut Vec<ResearchEntry>) {
    let item = peel(item);
    let obj = match item.as_object() {
        Some(obj) => obj,
        None => return,
    };

    if is_direct_shape(obj) {
        if let Some(entry) = build_entry(company, obj, None, ids) {
            out.push(entry);
        }
        return;
    }

    for (category, value) in obj {
        match peel(value.clone()) {
            Value::Array(candidates) => {
                for candidate in candidates {
                    let candidate = peel(candidate);
                    if let Some(map) = candidate.as_object() {
                        if let Some(entry) = build_entry(company, map, Some(category.as_str()), ids)
                        {
                            out.push(entry);
                        }
                    }
                }
            }
            Value::Object(ref map) => {
                if let Some(entry) = build_entry(company, map, Some(category.as_str()), ids) {
                    out.push(entry);
                }
            }
            // Scalars and nulls under a category key carry no entry.
            _ => {}
        }
    }
}

/// Turn one candidate object into an entry, or drop it.
///
/// Permissive validity policy: any of title/summary/url non-blank keeps the
/// candidate. A candidate whose only usable field is `error` becomes a
/// visible error card instead of disappearing.
fn build_entry(
    company: &str,
    obj: &Map<String, Value>,
    category_tag: Option<&str>,
    ids: &EntryIdGen,
) -> Option<ResearchEntry> {
    let category = non_blank_str(obj.get("category"))
        .or_else(|| category_tag.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let title = non_blank_str(obj.get("title"));
    let summary = non_blank_str(obj.get("summary"));
    let url = non_blank_str(obj.get("url"));

    if title.is_none() && summary.is_none() && url.is_none() {
        let error = non_blank_str(obj.get("error"))?;
        return Some(ResearchEntry {
            id: ids.next(&category),
            company_name: company.to_string(),
            title: format!("{} Error", category),
            summary: error,
            url: NO_LINK.to_string(),
            category,
            posted_date: None,
        });
    }

    Some(ResearchEntry {
        id: ids.next(&category),
        company_name: company.to_string(),
        title: title.unwrap_or_else(|| "Untitled".to_string()),
        summary: summary.unwrap_or_default(),
        url: url.unwrap_or_else(|| NO_LINK.to_string()),
        category,
        posted_date: non_blank_str(obj.get("postedDate")),
    })
}

/// Batch-local dedup by URL, case- and whitespace-insensitive. First seen
/// wins. The "#" sentinel never collides; linkless entries are all kept.
fn dedup_by_url(entries: Vec<ResearchEntry>) -> Vec<ResearchEntry> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let key = entry.url.trim().to_lowercase();
        if key.is_empty() || key == NO_LINK || seen.insert(key) {
            out.push(entry);
        }
    }
    out
}

fn placeholder_entry(company: &str, ids: &EntryIdGen) -> ResearchEntry {
    ResearchEntry {
        id: ids.next(DEFAULT_CATEGORY),
        company_name: company.to_string(),
        category: DEFAULT_CATEGORY.to_string(),
        title: "No articles found".to_string(),
        summary: format!("The research run returned no readable articles for {}.", company),
        url: NO_LINK.to_string(),
        posted_date: None,
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn non_blank_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> EntryIdGen {
        EntryIdGen::with_clock(|| 1_700_000_000_000)
    }

    fn run(body: &str) -> NormalizedBatch {
        normalize("Acme", body, &ids())
    }

    #[test]
    fn test_direct_array_yields_all_entries_in_order() {
        let body = r#"[
            {"title": "First", "summary": "S1", "url": "http://a.com"},
            {"title": "Second", "summary": "S2", "url": "http://b.com"},
            {"title": "Third", "summary": "S3", "url": "http://c.com"}
        ]"#;
        let batch = run(body);
        assert!(batch.debrief.is_none());
        assert_eq!(batch.entries.len(), 3);
        assert_eq!(batch.entries[0].title, "First");
        assert_eq!(batch.entries[2].title, "Third");
        assert_eq!(batch.entries[0].category, "Research");
        assert_eq!(batch.entries[0].company_name, "Acme");
    }

    #[test]
    fn test_bare_object_wrapped_as_single_entry() {
        let batch = run(r#"{"title": "Solo", "summary": "S", "url": "http://a.com"}"#);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "Solo");
    }

    #[test]
    fn test_garbage_body_yields_placeholder() {
        let batch = run("not json");
        assert!(batch.debrief.is_none());
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "No articles found");
        assert_eq!(batch.entries[0].url, NO_LINK);
    }

    #[test]
    fn test_empty_shapes_yield_placeholder() {
        for body in ["{}", "[]", "null", "42", "\"just a string\""] {
            let batch = run(body);
            assert_eq!(batch.entries.len(), 1, "body: {}", body);
            assert_eq!(batch.entries[0].title, "No articles found", "body: {}", body);
        }
    }

    #[test]
    fn test_dedup_is_case_and_whitespace_insensitive() {
        let body = r#"[
            {"title": "Kept", "summary": "S", "url": " http://X.com/a "},
            {"title": "Dropped", "summary": "S", "url": "http://x.com/a"}
        ]"#;
        let batch = run(body);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "Kept");
    }

    #[test]
    fn test_linkless_entries_never_collide() {
        let body = r#"[
            {"title": "A", "summary": "S1"},
            {"title": "B", "summary": "S2"}
        ]"#;
        let batch = run(body);
        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].url, NO_LINK);
        assert_eq!(batch.entries[1].url, NO_LINK);
    }

    #[test]
    fn test_double_encoded_category_payload() {
        let body = r#"{"News": "[{\"title\":\"A\",\"summary\":\"B\",\"url\":\"http://x\"}]"}"#;
        let batch = run(body);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].category, "News");
        assert_eq!(batch.entries[0].title, "A");
        assert_eq!(batch.entries[0].summary, "B");
        assert_eq!(batch.entries[0].url, "http://x");
    }

    #[test]
    fn test_grouped_single_object_value() {
        let body = r#"{"Funding": {"title": "Round", "summary": "Series B", "url": "http://f"}}"#;
        let batch = run(body);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].category, "Funding");
    }

    #[test]
    fn test_scalar_category_values_are_skipped() {
        let batch = run(r#"{"News": 42, "Other": "plain text"}"#);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "No articles found");
    }

    #[test]
    fn test_debrief_bullets_extracted_and_consumed() {
        let body = r#"[{"bulletPoints": ["- **Point one**", "Point two"]}]"#;
        let batch = run(body);
        let debrief = batch.debrief.expect("debrief extracted");
        assert_eq!(debrief.bullet_points, vec!["Point one", "Point two"]);
        assert_eq!(debrief.title, "Content Debrief");
        // The debrief element never doubles as an entry, and an otherwise
        // empty batch with a debrief gets no placeholder.
        assert!(batch.entries.is_empty());
    }

    #[test]
    fn test_debrief_with_full_body_and_trailing_entry() {
        let body = r#"[
            {"fullBody": "Intro text.\n- **Risk A**\n- Risk B", "bulletPoints": []},
            {"url": "http://a.com", "title": "T", "summary": "S"}
        ]"#;
        let batch = run(body);
        let debrief = batch.debrief.expect("debrief extracted");
        assert_eq!(debrief.executive_summary.as_deref(), Some("Intro text."));
        assert_eq!(debrief.bullet_points, vec!["Risk A", "Risk B"]);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "T");
        assert_eq!(batch.entries[0].url, "http://a.com");
    }

    #[test]
    fn test_debrief_prefers_explicit_executive_summary() {
        let body = r#"[{"fullBody": "Prose here.", "executive_summary": "Explicit."}]"#;
        let batch = run(body);
        let debrief = batch.debrief.unwrap();
        assert_eq!(debrief.executive_summary.as_deref(), Some("Explicit."));
    }

    #[test]
    fn test_debrief_executive_summary_from_first_bullets() {
        // No prose lines at all: the summary falls back to the first three
        // bullets.
        let body = r#"[{"fullBody": "- One\n- Two\n- Three\n- Four"}]"#;
        let batch = run(body);
        let debrief = batch.debrief.unwrap();
        assert_eq!(debrief.executive_summary.as_deref(), Some("One Two Three"));
        assert_eq!(debrief.bullet_points.len(), 4);
    }

    #[test]
    fn test_debrief_supporting_points_shape() {
        let body = r#"[{"title": "Weekly Debrief", "supporting_points": ["• Alpha", "Beta"]}]"#;
        let batch = run(body);
        let debrief = batch.debrief.unwrap();
        assert_eq!(debrief.title, "Weekly Debrief");
        assert_eq!(debrief.bullet_points, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_debrief_totals_and_count_pass_through() {
        let body = r#"[{"bulletPoints": ["- A"], "totals": {"News": 3, "overall": 7}, "bulletPointCount": 1}]"#;
        let batch = run(body);
        let debrief = batch.debrief.unwrap();
        let totals = debrief.totals.unwrap();
        assert_eq!(totals.get("News"), Some(&3.0));
        assert_eq!(totals.get("overall"), Some(&7.0));
        assert_eq!(debrief.bullet_point_count, Some(1));
    }

    #[test]
    fn test_double_encoded_debrief_first_element() {
        let body = r#"["{\"fullBody\":\"Lead paragraph.\"}", {"title": "T", "summary": "S", "url": "http://t"}]"#;
        let batch = run(body);
        let debrief = batch.debrief.expect("peeled debrief");
        assert_eq!(debrief.executive_summary.as_deref(), Some("Lead paragraph."));
        assert_eq!(batch.entries.len(), 1);
    }

    #[test]
    fn test_titled_first_entry_is_not_a_debrief() {
        let body = r#"[
            {"title": "Article one", "summary": "S1", "url": "http://1"},
            {"title": "Article two", "summary": "S2", "url": "http://2"}
        ]"#;
        let batch = run(body);
        assert!(batch.debrief.is_none());
        assert_eq!(batch.entries.len(), 2);
    }

    #[test]
    fn test_error_only_payload_becomes_error_card() {
        let batch = run(r#"{"News": {"error": "scrape blocked"}}"#);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "News Error");
        assert_eq!(batch.entries[0].summary, "scrape blocked");
        assert_eq!(batch.entries[0].url, NO_LINK);
    }

    #[test]
    fn test_fieldless_candidates_are_dropped() {
        let batch = run(r#"{"News": [{"irrelevant": true}, {"title": "Real", "url": "http://r"}]}"#);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].title, "Real");
    }

    #[test]
    fn test_title_defaults_to_untitled() {
        let batch = run(r#"[{"summary": "Only a summary"}]"#);
        assert_eq!(batch.entries[0].title, "Untitled");
        assert_eq!(batch.entries[0].summary, "Only a summary");
    }

    #[test]
    fn test_posted_date_kept_only_when_non_blank() {
        let body = r#"[
            {"title": "Dated", "summary": "S", "url": "http://d", "postedDate": "2026-08-01"},
            {"title": "Blank", "summary": "S", "url": "http://b", "postedDate": "  "}
        ]"#;
        let batch = run(body);
        assert_eq!(batch.entries[0].posted_date.as_deref(), Some("2026-08-01"));
        assert_eq!(batch.entries[1].posted_date, None);
    }

    #[test]
    fn test_explicit_category_field_beats_default() {
        let batch = run(r#"[{"title": "T", "summary": "S", "category": "Press"}]"#);
        assert_eq!(batch.entries[0].category, "Press");
    }

    #[test]
    fn test_entry_ids_are_unique_across_a_batch() {
        let body = r#"[
            {"title": "A", "summary": "S", "url": "http://a"},
            {"title": "B", "summary": "S", "url": "http://b"}
        ]"#;
        let batch = run(body);
        assert_ne!(batch.entries[0].id, batch.entries[1].id);
    }
}
