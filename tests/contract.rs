use hoops_terminal::contract::validate;
use hoops_terminal::error::FetchError;
use hoops_terminal::panel::Page;
use serde_json::json;

#[test]
fn narrative_requires_ok_and_markdown() {
    let contract = Page::Narrative.contract();
    assert_eq!(validate(contract, &json!({"ok": true, "markdown": "# X"})), Ok(()));
    assert_eq!(
        validate(contract, &json!({"markdown": "# X"})),
        Err(FetchError::contract("missing `ok` flag"))
    );
    assert_eq!(
        validate(contract, &json!({"ok": true})),
        Err(FetchError::contract("missing `markdown`"))
    );
}

#[test]
fn ok_false_carries_backend_error_verbatim() {
    let err = validate(
        Page::Players.contract(),
        &json!({"ok": false, "error": "Upstream API error: 429"}),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Upstream API error: 429");
    assert_eq!(err.kind(), "backend");
}

#[test]
fn ok_false_without_message_gets_default_text() {
    let err = validate(Page::Games.contract(), &json!({"ok": false})).unwrap_err();
    assert_eq!(err, FetchError::backend("backend reported ok=false"));
}

#[test]
fn ok_false_applies_to_endpoints_without_ok() {
    let err = validate(
        Page::Offense.contract(),
        &json!({"ok": false, "error": "no data", "teams": []}),
    )
    .unwrap_err();
    assert_eq!(err, FetchError::backend("no data"));
}

#[test]
fn field_only_contracts_ignore_missing_ok() {
    assert_eq!(validate(Page::Offense.contract(), &json!({"teams": []})), Ok(()));
    assert_eq!(
        validate(Page::Trends.contract(), &json!({"player_trends": [], "team_trends": []})),
        Ok(())
    );
    assert_eq!(
        validate(Page::Trends.contract(), &json!({"player_trends": null})),
        Err(FetchError::contract("missing `player_trends`"))
    );
}

#[test]
fn non_object_payload_is_rejected() {
    let err = validate(Page::Odds.contract(), &json!([1, 2, 3])).unwrap_err();
    assert!(matches!(err, FetchError::Contract { .. }));
}

#[test]
fn non_bool_ok_is_rejected_when_required() {
    let err = validate(Page::Narrative.contract(), &json!({"ok": "yes", "markdown": ""})).unwrap_err();
    assert!(matches!(err, FetchError::Contract { .. }));
}
