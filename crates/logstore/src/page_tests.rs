// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_parses_scheduler_body() {
    let body = r#"{"logDateTim": 1586629003729, "logId": 5, "fromLineNum": 1}"#;
    let request: LogRequest = serde_json::from_str(body).unwrap();
    assert_eq!(request.log_id, 5);
    assert_eq!(request.from_line_num, 1);
    assert_eq!(request.job_id, None);
}

#[test]
fn page_serializes_with_protocol_field_names() {
    let page = LogPage::from_lines(1, 2, vec!["a".to_string(), "b".to_string()]);
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["fromLineNum"], 1);
    assert_eq!(value["toLineNum"], 2);
    assert_eq!(value["logContent"], "a\nb\n");
    assert_eq!(value["isEnd"], true);
}

#[test]
fn empty_store_reports_not_found() {
    let page = LogPage::from_lines(1, 0, vec![]);
    assert_eq!(page.log_content, NO_SUCH_LOG);
    assert!(page.is_end);
    assert_eq!(page.to_line_num, 1);
}

#[test]
fn window_past_the_end_is_empty_and_final() {
    let page = LogPage::from_lines(81, 80, vec![]);
    assert_eq!(page.from_line_num, 81);
    assert_eq!(page.to_line_num, 81);
    assert_eq!(page.log_content, "");
    assert!(page.is_end);
}

#[yare::parameterized(
    mid_window   = { 1, 80, 20, false },
    exact_end    = { 61, 80, 20, true },
    full_at_once = { 1, 5, 5, true },
)]
fn window_math(from: usize, total: usize, returned: usize, end: bool) {
    let lines: Vec<String> = (0..returned).map(|i| format!("line {}", from + i)).collect();
    let page = LogPage::from_lines(from, total, lines);
    assert_eq!(page.to_line_num, from + returned - 1);
    assert_eq!(page.is_end, end);
}

proptest::proptest! {
    /// Walking the pages from line 1 and concatenating reconstructs the
    /// whole transcript, regardless of page size.
    #[test]
    fn paging_concatenation_is_lossless(
        total in 0usize..200,
        window in 1usize..50,
    ) {
        let all: Vec<String> = (1..=total).map(|i| format!("record-{i}")).collect();
        let mut assembled = String::new();
        let mut from = 1usize;
        loop {
            let start = (from - 1).min(all.len());
            let end = (start + window).min(all.len());
            let page = LogPage::from_lines(from, total, all[start..end].to_vec());
            if total == 0 {
                proptest::prop_assert_eq!(page.log_content.as_str(), NO_SUCH_LOG);
                break;
            }
            assembled.push_str(&page.log_content);
            if page.is_end {
                break;
            }
            from = page.to_line_num + 1;
        }
        if total > 0 {
            let expected: String = all.iter().map(|l| format!("{l}\n")).collect();
            proptest::prop_assert_eq!(assembled, expected);
        }
    }
}
