//! Property-based tests for aggregation invariants

use chrono::TimeDelta;
use proptest::prelude::*;
use serde_json::json;
use workflow_report::aggregate::naming::humanize;
use workflow_report::aggregate::paginate;
use workflow_report::backend::{Page, PageRequest};
use workflow_report::report::{
    failed_percentage, format_duration, to_artifacts, FailureIndex, FailureRecord, ModuleStats,
    RunReport,
};
use workflow_report::ReportResult;

fn module_stats() -> impl Strategy<Value = ModuleStats> {
    ("[A-Z][a-z]{2,8}( [A-Z][a-z]{2,8}){0,2}", 0u64..100_000, 0u64..100_000)
        .prop_flat_map(|(module, total, seconds)| {
            (Just(module), Just(total), 0..=total, Just(seconds))
        })
        .prop_map(|(module, total, failed, seconds)| ModuleStats {
            module,
            total,
            succeeded: total - failed,
            failed,
            execution_time: format_duration(TimeDelta::seconds(seconds as i64)),
        })
}

/// Serve `items` in pages of `page_size` using offset tokens
fn serve(items: &[u32], request: &PageRequest, page_size: usize) -> ReportResult<Page<u32>> {
    let offset = request
        .token
        .as_deref()
        .map_or(0, |t| t.parse::<usize>().unwrap());
    let end = (offset + page_size.min(request.max_results)).min(items.len());
    Ok(Page {
        items: items[offset..end].to_vec(),
        next_token: (end < items.len()).then(|| end.to_string()),
    })
}

proptest! {
    #[test]
    fn prop_percentage_matches_definition(total in 0u64..1_000_000, ratio in 0.0f64..=1.0) {
        let failed = (total as f64 * ratio) as u64;
        let percentage = failed_percentage(failed, total);

        if total == 0 {
            prop_assert_eq!(percentage, 0.0);
        } else {
            prop_assert!((percentage - failed as f64 / total as f64 * 100.0).abs() < 1e-9);
        }
        prop_assert!((0.0..=100.0).contains(&percentage));
    }

    #[test]
    fn prop_pagination_is_complete(
        items in prop::collection::vec(any::<u32>(), 0..200),
        page_size in 1usize..25,
    ) {
        let collected = tokio_test::block_on(paginate(1000, |request| {
            let page = serve(&items, &request, page_size);
            async move { page }
        }))
        .unwrap();
        prop_assert_eq!(collected, items);
    }

    #[test]
    fn prop_documents_reparse_to_inputs(
        modules in prop::collection::vec(module_stats(), 0..8),
        indexes in prop::collection::vec(any::<u64>(), 0..5),
    ) {
        let report = RunReport {
            name: "exec-42".to_string(),
            temporal_range: None,
            modules,
            total_time: "0:00:00".to_string(),
        };
        let mut failures = FailureIndex::new();
        for module in report.modules.iter().filter(|m| m.failed > 0) {
            failures.insert(
                module.module.clone(),
                indexes
                    .iter()
                    .map(|&index| FailureRecord { index, value: json!({"item": index}) })
                    .collect(),
            );
        }

        let documents = to_artifacts(&report, &failures).unwrap();
        let (parsed_report, parsed_failures) = documents.parse().unwrap();
        prop_assert_eq!(parsed_report, report);
        prop_assert_eq!(parsed_failures, failures);
    }

    #[test]
    fn prop_humanize_is_stable(
        identifier in "[a-z0-9]{1,8}([-_][a-z0-9]{1,8}){0,3}",
        separator in prop::sample::select(vec!['-', '_']),
    ) {
        let once = humanize(&identifier, separator);
        prop_assert!(!once.contains(separator));
        prop_assert_eq!(once.len(), identifier.len());
        prop_assert_eq!(humanize(&once, separator), once.clone());
    }

    #[test]
    fn prop_duration_under_a_day(seconds in 0i64..86_400) {
        let text = format_duration(TimeDelta::seconds(seconds));
        let parts: Vec<i64> = text.split(':').map(|p| p.parse().unwrap()).collect();
        prop_assert_eq!(parts.len(), 3);
        prop_assert_eq!(parts[0] * 3600 + parts[1] * 60 + parts[2], seconds);
    }
}
