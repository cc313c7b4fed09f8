// tests/quota_and_subscription.rs
// Requer DATABASE_URL; sem ela cada teste retorna cedo.

mod common;

use rust_decimal::Decimal;

use common::{create_plan, register_tenant, setup, unique, PASSWORD};
use tenant_gate::{
    common::error::AppError,
    models::calls::CreateCallPayload,
    models::subscription::{QuotaDecision, ResourceKind},
};

fn call() -> CreateCallPayload {
    CreateCallPayload {
        caller: "+5511999990000".into(),
        callee: "+5511888880000".into(),
        billsec: 42,
        recording_url: None,
        cost: Decimal::new(15, 2),
    }
}

#[tokio::test]
async fn without_subscription_every_quota_check_fails() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "NoSub").await;
    let tenant_id = admin.user.tenant_id;

    let decision = state.quota_service.check_quota(tenant_id, ResourceKind::Calls).await.unwrap();
    assert_eq!(decision, QuotaDecision::NoSubscription);

    let create = state.call_service.create_call(tenant_id, &call()).await;
    assert!(matches!(create, Err(AppError::NoActiveSubscription)));

    assert!(matches!(
        state.quota_service.usage_report(tenant_id).await,
        Err(AppError::NoActiveSubscription)
    ));
}

#[tokio::test]
async fn users_quota_counts_active_memberships() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Seats").await;
    let (tenant_id, role_id) = (admin.user.tenant_id, admin.user.role_id);

    let plan = create_plan(&state, 2, 100).await;
    state.subscription_service.subscribe(tenant_id, plan.id).await.unwrap();

    // Admin ocupa 1 de 2
    let second = state
        .auth_service
        .register_user(tenant_id, &unique("second"), PASSWORD, role_id)
        .await
        .unwrap();

    let third_name = unique("third");
    let denied = state
        .auth_service
        .register_user(tenant_id, &third_name, PASSWORD, role_id)
        .await;
    assert!(matches!(denied, Err(AppError::QuotaExceeded(ResourceKind::Users))));

    // Desativar um vínculo libera a vaga
    state.tenant_service.remove_member(tenant_id, second.user.id).await.unwrap();
    state
        .auth_service
        .register_user(tenant_id, &third_name, PASSWORD, role_id)
        .await
        .unwrap();

    let report = state.quota_service.usage_report(tenant_id).await.unwrap();
    assert_eq!(report.active_users, 2);
    assert_eq!(report.users_remaining, 0);
}

#[tokio::test]
async fn membership_from_another_tenant_uses_a_seat() {
    let Some(state) = setup().await else { return };
    let home = register_tenant(&state, "Home").await;
    let guest = register_tenant(&state, "Guest").await;
    let tenant_id = home.user.tenant_id;

    let plan = create_plan(&state, 2, 10).await;
    state.subscription_service.subscribe(tenant_id, plan.id).await.unwrap();

    state.tenant_service.add_member(tenant_id, guest.user.id).await.unwrap();
    assert!(matches!(
        state.tenant_service.add_member(tenant_id, guest.user.id).await,
        Err(AppError::MembershipExists)
    ));

    let decision = state.quota_service.check_quota(tenant_id, ResourceKind::Users).await.unwrap();
    assert_eq!(decision, QuotaDecision::Deny { used: 2, limit: 2 });

    // Sai e volta: nova linha ativa, histórico preservado
    state.tenant_service.remove_member(tenant_id, guest.user.id).await.unwrap();
    state.tenant_service.add_member(tenant_id, guest.user.id).await.unwrap();

    let members = state.tenant_service.list_members(tenant_id).await.unwrap();
    let guest_rows: Vec<_> = members.iter().filter(|m| m.user_id == guest.user.id).collect();
    assert_eq!(guest_rows.len(), 2);
    assert_eq!(guest_rows.iter().filter(|m| m.is_active).count(), 1);
}

#[tokio::test]
async fn calls_quota_is_lifetime_and_ignores_deleted_calls() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Dialer").await;
    let tenant_id = admin.user.tenant_id;

    let plan = create_plan(&state, 5, 1).await;
    state.subscription_service.subscribe(tenant_id, plan.id).await.unwrap();

    let first = state.call_service.create_call(tenant_id, &call()).await.unwrap();
    assert!(matches!(
        state.call_service.create_call(tenant_id, &call()).await,
        Err(AppError::QuotaExceeded(ResourceKind::Calls))
    ));

    state.call_service.delete_call(tenant_id, first.id).await.unwrap();
    assert!(matches!(
        state.call_service.get_call(tenant_id, first.id).await,
        Err(AppError::CallNotFound)
    ));
    assert!(matches!(
        state.call_service.delete_call(tenant_id, first.id).await,
        Err(AppError::CallNotFound)
    ));

    state.call_service.create_call(tenant_id, &call()).await.unwrap();
    assert_eq!(state.call_service.list_calls(tenant_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_creations_never_overshoot_the_cap() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Burst").await;
    let tenant_id = admin.user.tenant_id;

    let plan = create_plan(&state, 5, 3).await;
    state.subscription_service.subscribe(tenant_id, plan.id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let calls = state.call_service.clone();
        handles.push(tokio::spawn(async move { calls.create_call(tenant_id, &call()).await }));
    }

    let mut created = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::QuotaExceeded(ResourceKind::Calls)) => denied += 1,
            Err(other) => panic!("erro inesperado: {other:?}"),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(denied, 5);
}

#[tokio::test]
async fn subscribing_again_swaps_the_active_plan() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Upgrade").await;
    let tenant_id = admin.user.tenant_id;

    let plan_a = create_plan(&state, 1, 1).await;
    let plan_b = create_plan(&state, 10, 10).await;

    state.subscription_service.subscribe(tenant_id, plan_a.id).await.unwrap();
    let active = state.subscription_service.subscribe(tenant_id, plan_b.id).await.unwrap();
    assert_eq!(active.plan.id, plan_b.id);

    let history = state.subscription_service.history(tenant_id).await.unwrap();
    assert_eq!(history.len(), 2);

    let actives: Vec<_> = history.iter().filter(|s| s.is_active).collect();
    assert_eq!(actives.len(), 1);
    assert_eq!(actives[0].plan_id, plan_b.id);

    let ended = history.iter().find(|s| s.plan_id == plan_a.id).unwrap();
    assert!(!ended.is_active);
    assert!(ended.ended_at.is_some());

    let current = state.subscription_service.get_active_subscription(tenant_id).await.unwrap();
    assert_eq!(current.subscription.id, active.subscription.id);

    // Limites do novo plano já valem
    let report = state.quota_service.usage_report(tenant_id).await.unwrap();
    assert_eq!(report.max_users, 10);
    assert_eq!(report.users_remaining, 9);
}

#[tokio::test]
async fn plan_with_subscriptions_cannot_be_deleted() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "PlanLock").await;

    let plan = create_plan(&state, 3, 3).await;
    state.subscription_service.subscribe(admin.user.tenant_id, plan.id).await.unwrap();
    assert!(matches!(
        state.subscription_service.delete_plan(plan.id).await,
        Err(AppError::PlanInUse)
    ));

    // Plano trocado continua preso pela assinatura encerrada
    let replacement = create_plan(&state, 3, 3).await;
    state.subscription_service.subscribe(admin.user.tenant_id, replacement.id).await.unwrap();
    assert!(matches!(
        state.subscription_service.delete_plan(plan.id).await,
        Err(AppError::PlanInUse)
    ));

    let unused = create_plan(&state, 1, 1).await;
    state.subscription_service.delete_plan(unused.id).await.unwrap();
    assert!(matches!(
        state.subscription_service.get_plan(unused.id).await,
        Err(AppError::PlanNotFound)
    ));
}

#[tokio::test]
async fn subscribe_checks_tenant_and_plan() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Checks").await;
    let plan = create_plan(&state, 1, 1).await;

    assert!(matches!(
        state.subscription_service.subscribe(uuid::Uuid::new_v4(), plan.id).await,
        Err(AppError::TenantNotFound)
    ));
    assert!(matches!(
        state.subscription_service.subscribe(admin.user.tenant_id, uuid::Uuid::new_v4()).await,
        Err(AppError::PlanNotFound)
    ));
    assert!(matches!(
        state.subscription_service.get_active_subscription(admin.user.tenant_id).await,
        Err(AppError::SubscriptionNotFound)
    ));
}

#[tokio::test]
async fn tenant_with_users_cannot_be_deleted() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Busy").await;

    assert!(matches!(
        state.tenant_service.delete_tenant(admin.user.tenant_id).await,
        Err(AppError::TenantInUse(_))
    ));

    let empty = state
        .tenant_service
        .create_tenant("Vazio", &unique("vazio.example.com"))
        .await
        .unwrap();
    state.tenant_service.delete_tenant(empty.id).await.unwrap();
    assert!(matches!(
        state.tenant_service.get_tenant(empty.id).await,
        Err(AppError::TenantNotFound)
    ));
}
