//! Integration tests for tally-core
//!
//! These tests exercise the full seed → analyze → reconcile workflow against a
//! real SQLite store and the mock AI backend.

use tally_core::{
    models::{CategoryState, MemberRole, SplitPolicy},
    validation::ValidationPolicy,
    Database, Error, ErrorKind, ExpenseAnalyzer, ExtractionChannel, GroupStore, MediaPart,
    MockBackend, PromptLibrary, TallyConfig, UNREADABLE_MESSAGE,
};

struct Group {
    db: Database,
    group_id: String,
    ana: String,
    beto: String,
}

/// Group "Depto" with Ana (requester) and Beto, seeded default categories
fn seeded_group(policy: SplitPolicy, percents: (Option<f64>, Option<f64>)) -> Group {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let group_id = db.create_group("Depto", policy).unwrap();
    db.seed_default_categories(&group_id).unwrap();

    let ana = db.create_user("Ana", Some("ana@example.com")).unwrap();
    let beto = db.create_user("Beto", None).unwrap();
    db.add_member(&group_id, &ana, MemberRole::Admin, percents.0)
        .unwrap();
    db.add_member(&group_id, &beto, MemberRole::Member, percents.1)
        .unwrap();

    Group {
        db,
        group_id,
        ana,
        beto,
    }
}

fn analyzer(db: &Database, response: &str) -> ExpenseAnalyzer<Database, MockBackend> {
    ExpenseAnalyzer::new(
        db.clone(),
        MockBackend::with_response(response),
        TallyConfig::default(),
    )
    .with_prompts(PromptLibrary::embedded_only())
}

// =============================================================================
// End-to-end workflow
// =============================================================================

#[tokio::test]
async fn test_equal_split_end_to_end() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(
        &g.db,
        r#"```json
{"title":"Almuerzo","date":"2024-05-10T12:00:00Z","description":"","detectedCategoryAmounts":[{"categoryName":"comida","amount":40,"items":"sandwiches"}],"detectedPayments":[],"detectedSplits":[]}
```"#,
    );

    let template = analyzer
        .analyze_text(&g.group_id, &g.ana, "almuerzo 40 pagó ana", None)
        .await
        .unwrap();

    let ana_member = g.db.find_active_member(&g.group_id, &g.ana).unwrap().unwrap();
    let beto_member = g.db.find_active_member(&g.group_id, &g.beto).unwrap().unwrap();

    assert_eq!(template.title, "Almuerzo");
    assert_eq!(template.total_amount, 40.0);
    assert_eq!(template.category_amounts.len(), 1);
    assert_eq!(template.category_amounts[0].category_name, "Comida");
    assert_eq!(template.category_amounts[0].items.as_deref(), Some("sandwiches"));

    assert_eq!(template.payments.len(), 1);
    assert_eq!(template.payments[0].member_id, ana_member.id);
    assert_eq!(template.payments[0].amount, 40.0);

    assert_eq!(template.splits.len(), 2);
    assert_eq!(template.splits[0].member_id, ana_member.id);
    assert_eq!(template.splits[1].member_id, beto_member.id);
    assert!(template.splits.iter().all(|s| s.amount == 20.0));

    assert_eq!(template.date.to_rfc3339(), "2024-05-10T12:00:00+00:00");
}

#[tokio::test]
async fn test_percentage_split_with_named_payer() {
    let g = seeded_group(SplitPolicy::Percentage, (Some(70.0), Some(30.0)));
    let analyzer = analyzer(
        &g.db,
        r#"{"title":"Compra en supermercado","detectedCategoryAmounts":[{"categoryName":"Comida","amount":80},{"categoryName":"Hogar","amount":20}],"detectedPayments":[{"memberName":"beto","amount":null}]}"#,
    );

    let template = analyzer
        .analyze_text(&g.group_id, &g.ana, "super 100, pagó Beto", Some(-3.0))
        .await
        .unwrap();

    assert_eq!(template.total_amount, 100.0);
    assert_eq!(template.payments.len(), 1);
    assert_eq!(template.payments[0].member_name, "Beto");
    assert_eq!(template.payments[0].amount, 100.0);

    let split_total: f64 = template.splits.iter().map(|s| s.amount).sum();
    assert!((split_total - 100.0).abs() < 0.01);
    assert_eq!(template.splits[0].amount, 70.0);
    assert_eq!(template.splits[1].amount, 30.0);
}

#[tokio::test]
async fn test_unknown_categories_fall_back_to_first() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(
        &g.db,
        r#"{"title":"Varios","detectedCategoryAmounts":[{"categoryName":"Mascotas","amount":12.5},{"categoryName":"Ropa","amount":7.5}]}"#,
    );

    let template = analyzer
        .analyze_text(&g.group_id, &g.ana, "varios", None)
        .await
        .unwrap();

    // First seeded category takes the whole amount
    assert_eq!(template.category_amounts.len(), 1);
    assert_eq!(template.category_amounts[0].category_name, "Comida");
    assert_eq!(template.total_amount, 20.0);
}

#[tokio::test]
async fn test_blank_category_name_falls_back_under_strict() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(
        &g.db,
        r#"{"title":"Almuerzo","detectedCategoryAmounts":[{"categoryName":"   ","amount":10}]}"#,
    );
    let template = analyzer
        .analyze_images(
            &g.group_id,
            &g.ana,
            vec![MediaPart::new(vec![0xff, 0xd8], "image/jpeg")],
        )
        .await
        .unwrap();

    assert_eq!(template.category_amounts.len(), 1);
    assert_eq!(template.category_amounts[0].category_name, "Comida");
    assert_eq!(template.category_amounts[0].amount, 10.0);
}

#[tokio::test]
async fn test_inactive_category_not_matched() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let hogar = g
        .db
        .list_active_categories(&g.group_id)
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Hogar")
        .unwrap();
    g.db.set_category_state(&hogar.id, CategoryState::Inactive)
        .unwrap();

    let analyzer = analyzer(
        &g.db,
        r#"{"title":"Lamparita","detectedCategoryAmounts":[{"categoryName":"Hogar","amount":15}]}"#,
    );
    let template = analyzer
        .analyze_text(&g.group_id, &g.ana, "lamparita 15", None)
        .await
        .unwrap();

    assert_eq!(template.category_amounts[0].category_name, "Comida");
}

#[tokio::test]
async fn test_departed_member_gets_no_split() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let beto = g.db.find_active_member(&g.group_id, &g.beto).unwrap().unwrap();
    g.db.leave_group(&beto.id).unwrap();

    let analyzer = analyzer(
        &g.db,
        r#"{"title":"Taxi","detectedCategoryAmounts":[{"categoryName":"Transporte","amount":30}],"detectedPayments":[{"memberName":"Beto","amount":30}]}"#,
    );
    let template = analyzer
        .analyze_text(&g.group_id, &g.ana, "taxi 30 pagó beto", None)
        .await
        .unwrap();

    assert_eq!(template.splits.len(), 1);
    assert_eq!(template.splits[0].member_name, "Ana");
    assert_eq!(template.splits[0].amount, 30.0);
    // Beto is no longer a member, so the requester paid
    assert_eq!(template.payments[0].member_name, "Ana");
}

// =============================================================================
// Failure modes
// =============================================================================

#[tokio::test]
async fn test_unreadable_sentinel() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(
        &g.db,
        r#"{"error":"unreadable","message":"La foto está borrosa."}"#,
    );

    let result = analyzer
        .analyze_images(
            &g.group_id,
            &g.ana,
            vec![MediaPart::new(vec![0xff, 0xd8], "image/jpeg")],
        )
        .await;

    match result {
        Err(e @ Error::UnreadableInput(_)) => {
            assert_eq!(e.to_string(), "La foto está borrosa.");
            assert_eq!(e.kind(), ErrorKind::UserInput);
        }
        other => panic!("expected UnreadableInput, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_response_is_internal() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(&g.db, "Lo siento, no puedo ayudar con eso.");

    let result = analyzer
        .analyze_text(&g.group_id, &g.ana, "algo", None)
        .await;

    match result {
        Err(e @ Error::MalformedResponse { .. }) => assert_eq!(e.kind(), ErrorKind::Internal),
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_uncertain_image_extraction_rejected() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(
        &g.db,
        r#"{"title":"Compra","detectedCategoryAmounts":[{"categoryName":"Comida (ilegible)","amount":12}]}"#,
    );

    let result = analyzer
        .analyze_images(
            &g.group_id,
            &g.ana,
            vec![MediaPart::new(vec![1], "image/png")],
        )
        .await;
    assert!(matches!(result, Err(Error::UnreadableInput(msg)) if msg == UNREADABLE_MESSAGE));
}

#[tokio::test]
async fn test_zero_amount_rejected_on_every_channel() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let raw = r#"{"title":"Compra","detectedCategoryAmounts":[{"categoryName":"Comida","amount":0}]}"#;
    let analyzer = analyzer(&g.db, raw);

    for channel in ExtractionChannel::all() {
        let result = analyzer.reconcile_response(&g.group_id, &g.ana, *channel, raw, None);
        assert!(
            matches!(result, Err(Error::UnreadableInput(_))),
            "channel {} accepted a zero amount",
            channel
        );
    }
}

#[tokio::test]
async fn test_group_and_membership_errors() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let analyzer = analyzer(&g.db, "{}");

    let missing = analyzer
        .analyze_text("no-such-group", &g.ana, "taxi", None)
        .await;
    assert!(matches!(&missing, Err(Error::GroupNotFound(_))));
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::NotFound);

    let outsider = g.db.create_user("Carla", None).unwrap();
    let forbidden = analyzer
        .analyze_text(&g.group_id, &outsider, "taxi", None)
        .await;
    assert_eq!(forbidden.unwrap_err().kind(), ErrorKind::Forbidden);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_text_channel_policy_from_config() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let raw = r#"{"title":"Compra","detectedCategoryAmounts":[{"categoryName":"Comida?","amount":10}]}"#;

    let mut config = TallyConfig::default();
    config.validation.text = ValidationPolicy::Strict;
    let strict = ExpenseAnalyzer::new(g.db.clone(), MockBackend::new(), config)
        .with_prompts(PromptLibrary::embedded_only());
    let result = strict.reconcile_response(&g.group_id, &g.ana, ExtractionChannel::Text, raw, None);
    assert!(matches!(result, Err(Error::UnreadableInput(_))));

    let default = analyzer(&g.db, raw);
    let template = default
        .reconcile_response(&g.group_id, &g.ana, ExtractionChannel::Text, raw, None)
        .unwrap();
    assert_eq!(template.total_amount, 10.0);
}

#[test]
fn test_template_serializes_camel_case() {
    let g = seeded_group(SplitPolicy::Equal, (None, None));
    let raw = r#"{"title":"Taxi","detectedCategoryAmounts":[{"categoryName":"Transporte","amount":15}]}"#;
    let template = analyzer(&g.db, raw)
        .reconcile_response(&g.group_id, &g.beto, ExtractionChannel::Text, raw, None)
        .unwrap();

    let json = serde_json::to_value(&template).unwrap();
    assert_eq!(json["totalAmount"], 15.0);
    assert_eq!(json["categoryAmounts"][0]["categoryName"], "Transporte");
    assert_eq!(json["payments"][0]["memberName"], "Beto");
    assert!(json["splits"][0]["memberId"].is_string());
}
