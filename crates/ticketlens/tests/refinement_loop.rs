mod common;

use serde_json::json;
use tempfile::TempDir;
use ticketlens_analysis::{FeatureRefiner, PrevalenceAnalyzer};
use ticketlens_core::{ResultsDocument, Settings, TicketContext};
use ticketlens_query::{Generation, InstructionDocument, QueryGenerator};
use ticketlens_store::{read_json, write_json, Paths};

use common::{cst, results_with_rows, sample_context, sample_now, LOGIN_TICKET};

fn expressions(doc: &InstructionDocument) -> Vec<String> {
    doc.queries
        .iter()
        .skip(1)
        .map(|q| {
            q.params["query"]["compositeQuery"]["queries"][0]["spec"]["filter"]["expression"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

#[test]
fn test_refinement_only_adds_constraints() {
    let generator = QueryGenerator::new(Settings::default(), sample_now());
    let mut context = sample_context(&format!("服务: auth {}", LOGIN_TICKET));

    let Generation::Ready(first) = generator.generate(&context) else {
        panic!("expected instructions");
    };
    let results = results_with_rows(vec![
        json!({"attributes": {"user.id": "u-9", "user.client_id": "dev-3"},
               "resources": {"service.name": "auth"}}),
        json!({"user.id": "u-10", "geo.country_name": "Japan"}),
    ]);

    let Generation::Ready(second) = generator.generate_refined(&mut context, &results, &FeatureRefiner)
    else {
        panic!("expected instructions");
    };
    assert_eq!(context.refinements, 1);
    assert_eq!(context.ticket_info.user_info.id(), Some("u-9"));
    assert_eq!(context.ticket_info.region_info.country.as_deref(), Some("Japan"));

    for (before, after) in expressions(&first).iter().zip(expressions(&second).iter()) {
        for clause in before.split(" AND ") {
            assert!(after.contains(clause), "{} lost {}", after, clause);
        }
        assert!(after.contains("user.id IN ('u-9')"));
        assert!(after.contains("user.client_id IN ('dev-3')"));
    }

    let Generation::Ready(third) = generator.generate_refined(&mut context, &results, &FeatureRefiner)
    else {
        panic!("expected instructions");
    };
    assert_eq!(context.refinements, 1);
    assert_eq!(second, third);
}

#[test]
fn test_persisted_round_through_store() {
    let temp = TempDir::new().unwrap();
    let paths = Paths::new(temp.path());
    let context = sample_context(&format!("服务: auth 浏览器: Chrome 120 {}", LOGIN_TICKET));
    let ticket = paths.ticket(&context.ticket_id);
    write_json(&ticket.context_file(), &context).unwrap();

    let loaded: TicketContext = read_json(&ticket.context_file()).unwrap().unwrap();
    assert_eq!(loaded, context);

    let analyzer = PrevalenceAnalyzer::new(Settings::default(), cst(), sample_now());
    let Generation::Ready(doc) = analyzer.build_query(&loaded) else {
        panic!("expected prevalence query");
    };
    write_json(&ticket.prevalence_instructions_file(), &doc).unwrap();
    let expr = doc.queries[0].params["query"]["compositeQuery"]["queries"][0]["spec"]["filter"]
        ["expression"]
        .as_str()
        .unwrap();
    assert!(expr.contains("service.name IN ('auth')"));
    assert!(expr.contains("browser.name IN ('Chrome')"));
    assert!(!expr.contains("user.id"));

    let missing: Option<ResultsDocument> = read_json(&ticket.prevalence_results_file()).unwrap();
    assert!(missing.is_none());
}
