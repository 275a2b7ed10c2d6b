use std::sync::Arc;

use attrivo_core::{AppError, TenantId};
use attrivo_domain::{
    VisibilityCondition, VisibilityMode, VisibilityOperator, VisibilityRule, VisibilityRuleInput,
};
use serde_json::json;

use super::FieldDefinitionService;
use crate::test_support::{
    FakeFieldRepository, FakeValueRepository, ReversingEncryptor, company, field_input, options,
    registry,
};
use crate::TypedValueStore;

struct Fixture {
    service: FieldDefinitionService,
    store: TypedValueStore,
    values: Arc<FakeValueRepository>,
}

fn fixture() -> Fixture {
    let registry = registry();
    let values = Arc::new(FakeValueRepository::default());
    Fixture {
        service: FieldDefinitionService::new(
            Arc::new(FakeFieldRepository::default()),
            values.clone(),
            registry.clone(),
        ),
        store: TypedValueStore::new(values.clone(), registry, Arc::new(ReversingEncryptor)),
        values,
    }
}

fn shown_for_premium() -> VisibilityRule {
    VisibilityRule::new(VisibilityRuleInput {
        mode: VisibilityMode::ShowWhen,
        conditions: vec![
            VisibilityCondition::new("type", VisibilityOperator::Equals, json!("premium"))
                .unwrap_or_else(|_| unreachable!()),
        ],
        ..VisibilityRuleInput::default()
    })
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn create_resolves_field_type() {
    let fixture = fixture();
    let mut input = field_input("priority");
    input.options = options(&["Low", "Medium", "High"]);

    let field = fixture
        .service
        .create(None, "select", input)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(field.field_type(), "select");
    assert_eq!(field.options().len(), 3);

    let unknown = fixture
        .service
        .create(None, "hologram", field_input("shape"))
        .await;
    assert!(matches!(unknown, Err(AppError::Configuration(_))));
}

#[tokio::test]
async fn create_rejects_duplicate_codes_per_tenant() {
    let fixture = fixture();
    let tenant = Some(TenantId::new());

    let first = fixture.service.create(tenant, "text", field_input("nickname")).await;
    assert!(first.is_ok());

    let duplicate = fixture.service.create(tenant, "text", field_input("nickname")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let other_tenant = fixture.service.create(None, "text", field_input("nickname")).await;
    assert!(other_tenant.is_ok());
}

#[tokio::test]
async fn visibility_must_reference_existing_fields() {
    let fixture = fixture();
    let mut input = field_input("discount");
    input.settings.visibility = shown_for_premium();

    let missing = fixture.service.create(None, "text", input.clone()).await;
    assert!(matches!(missing, Err(AppError::Configuration(_))));

    let created = fixture.service.create(None, "text", field_input("type")).await;
    assert!(created.is_ok());
    let dependent = fixture.service.create(None, "text", input).await;
    assert!(dependent.is_ok());

    let referenced = fixture.service.delete(None, "company", "type").await;
    assert!(matches!(referenced, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn delete_is_refused_while_visibility_depends_on_the_field() {
    let fixture = fixture();
    for code in ["type", "notes"] {
        let created = fixture.service.create(None, "text", field_input(code)).await;
        assert!(created.is_ok());
    }
    let mut discount = field_input("discount");
    discount.settings.visibility = shown_for_premium();
    let created = fixture.service.create(None, "text", discount).await;
    assert!(created.is_ok());

    let referenced = fixture.service.delete(None, "company", "type").await;
    assert!(
        matches!(referenced, Err(AppError::Conflict(message)) if message.contains("discount"))
    );
    assert!(fixture.service.find_field(None, "company", "type").await.is_ok());

    let unrelated = fixture.service.delete(None, "company", "notes").await;
    assert!(unrelated.is_ok());
}

#[tokio::test]
async fn always_visible_leftover_conditions_do_not_block_delete() {
    let fixture = fixture();
    let created = fixture.service.create(None, "text", field_input("type")).await;
    assert!(created.is_ok());

    let mut discount = field_input("discount");
    discount.settings.visibility = VisibilityRule::new(VisibilityRuleInput {
        mode: VisibilityMode::AlwaysVisible,
        conditions: shown_for_premium().conditions().to_vec(),
        ..VisibilityRuleInput::default()
    })
    .unwrap_or_else(|_| unreachable!());
    let created = fixture.service.create(None, "text", discount.clone()).await;
    assert!(created.is_ok());

    let deleted = fixture.service.delete(None, "company", "type").await;
    assert!(deleted.is_ok());

    let updated = fixture
        .service
        .update(None, "company", "discount", discount)
        .await;
    assert!(updated.is_ok());
}

#[tokio::test]
async fn update_keeps_identity() {
    let fixture = fixture();
    let created = fixture
        .service
        .create(None, "text", field_input("nickname"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let mut input = field_input("nickname");
    input.name = "Nick name".to_owned();
    input.sort_order = 4;
    let updated = fixture
        .service
        .update(None, "company", "nickname", input)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(updated.id(), created.id());
    assert_eq!(updated.name(), "Nick name");

    let renamed = fixture
        .service
        .update(None, "company", "nickname", field_input("alias"))
        .await;
    assert!(matches!(renamed, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn deactivated_fields_leave_active_list() {
    let fixture = fixture();
    for (code, sort_order) in [("b_field", 1), ("a_field", 1), ("first", 0)] {
        let mut input = field_input(code);
        input.sort_order = sort_order;
        let created = fixture.service.create(None, "text", input).await;
        assert!(created.is_ok());
    }

    let deactivated = fixture
        .service
        .deactivate(None, "company", "a_field")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(!deactivated.is_active());

    let active: Vec<String> = fixture
        .service
        .list_active(None, "company")
        .await
        .unwrap_or_else(|_| unreachable!())
        .iter()
        .map(|field| field.code().to_owned())
        .collect();
    assert_eq!(active, vec!["first".to_owned(), "b_field".to_owned()]);

    let reactivated = fixture.service.activate(None, "company", "a_field").await;
    assert!(reactivated.is_ok_and(|field| field.is_active()));
}

#[tokio::test]
async fn delete_removes_values() {
    let fixture = fixture();
    let nickname = fixture
        .service
        .create(None, "text", field_input("nickname"))
        .await
        .unwrap_or_else(|_| unreachable!());
    for id in ["1", "2"] {
        let stored = fixture
            .store
            .set(None, &company(id), &nickname, &json!("Ace"))
            .await;
        assert!(stored.is_ok());
    }

    let removed = fixture
        .service
        .delete(None, "company", "nickname")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(removed, 2);
    assert!(fixture.values.rows.lock().await.is_empty());

    let missing = fixture.service.find_field(None, "company", "nickname").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn system_defined_fields_cannot_be_deleted() {
    let fixture = fixture();
    let mut input = field_input("external_id");
    input.system_defined = true;
    let created = fixture.service.create(None, "text", input).await;
    assert!(created.is_ok());

    let result = fixture.service.delete(None, "company", "external_id").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}
