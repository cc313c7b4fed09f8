// tests/authorization_flow.rs
// Requer DATABASE_URL; sem ela cada teste retorna cedo.

mod common;

use std::collections::BTreeSet;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{create_plan, grant, register_tenant, setup, unique, PASSWORD};
use tenant_gate::{
    common::error::AppError,
    models::rbac::{is_platform_code, TENANT_ADMIN_CODES},
    routes,
};

#[tokio::test]
async fn acme_admin_gets_exactly_the_granted_codes() {
    let Some(state) = setup().await else { return };

    // 1. Registro: tenant + Admin com os códigos de gestão do tenant
    let domain = unique("acme.example.com");
    let username = unique("alice");
    let registered = state
        .auth_service
        .register_tenant("Acme", &domain, &username, PASSWORD)
        .await
        .unwrap();
    let tenant_id = registered.user.tenant_id;
    let admin_role = registered.user.role_id;

    let role = state.rbac_service.get_role(tenant_id, admin_role).await.unwrap();
    assert_eq!(role.role.name, "Admin");
    let seeded: BTreeSet<&str> = role.permissions.iter().map(String::as_str).collect();
    assert_eq!(seeded, TENANT_ADMIN_CODES.iter().copied().collect::<BTreeSet<_>>());
    assert!(!role.permissions.iter().any(|c| is_platform_code(c)));

    // 2. Substitui por call.create apenas
    grant(&state, tenant_id, admin_role, &["call.create"]).await;

    // 3. Login e verificação do token
    let login = state.auth_service.login(&username, PASSWORD).await.unwrap();
    let identity = state.auth_service.verify_token(&login.token).unwrap();
    assert_eq!(identity.user_id, registered.user.id);
    assert_eq!(identity.tenant_id, tenant_id);
    assert_eq!(identity.role_id, admin_role);

    // 4. Decisões
    let rbac = &state.rbac_service;
    assert!(rbac.authorize(identity.tenant_id, identity.role_id, "call.create").await.is_ok());
    assert!(rbac.authorize(identity.tenant_id, identity.role_id, "CALL.Create").await.is_ok());
    assert!(matches!(
        rbac.authorize(identity.tenant_id, identity.role_id, "call.delete").await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn duplicate_domain_and_username_are_conflicts() {
    let Some(state) = setup().await else { return };

    let domain = unique("dup.example.com");
    let username = unique("bob");
    state
        .auth_service
        .register_tenant("Dup", &domain, &username, PASSWORD)
        .await
        .unwrap();

    let same_domain = state
        .auth_service
        .register_tenant("Dup 2", &domain, &unique("carol"), PASSWORD)
        .await;
    assert!(matches!(same_domain, Err(AppError::DomainTaken)));

    let same_user = state
        .auth_service
        .register_tenant("Dup 3", &unique("dup.example.com"), &username, PASSWORD)
        .await;
    assert!(matches!(same_user, Err(AppError::UsernameTaken)));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Creds").await;

    let wrong = state.auth_service.login(&admin.user.username, "senha-errada").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

    let unknown = state.auth_service.login(&unique("ninguem"), PASSWORD).await;
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn login_requires_active_membership_in_home_tenant() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Leaver").await;

    state
        .tenant_service
        .remove_member(admin.user.tenant_id, admin.user.id)
        .await
        .unwrap();

    let result = state.auth_service.login(&admin.user.username, PASSWORD).await;
    assert!(matches!(result, Err(AppError::InactiveMembership)));
}

#[tokio::test]
async fn assigning_the_same_permissions_twice_is_idempotent() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Idem").await;
    let (tenant_id, role_id) = (admin.user.tenant_id, admin.user.role_id);

    grant(&state, tenant_id, role_id, &["call.read", "call.create"]).await;
    let first = state.rbac_service.get_role(tenant_id, role_id).await.unwrap();

    grant(&state, tenant_id, role_id, &["call.create", "call.read"]).await;
    let second = state.rbac_service.get_role(tenant_id, role_id).await.unwrap();

    let as_set = |codes: &[String]| codes.iter().cloned().collect::<BTreeSet<_>>();
    assert_eq!(as_set(&first.permissions), as_set(&second.permissions));
    assert_eq!(second.permissions.len(), 2);

    // Substituição, não soma
    grant(&state, tenant_id, role_id, &["usage.read"]).await;
    let third = state.rbac_service.get_role(tenant_id, role_id).await.unwrap();
    assert_eq!(third.permissions, vec!["usage.read".to_string()]);
}

#[tokio::test]
async fn unknown_permission_ids_are_reported_and_nothing_changes() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Missing").await;
    let (tenant_id, role_id) = (admin.user.tenant_id, admin.user.role_id);

    grant(&state, tenant_id, role_id, &["call.read"]).await;
    let known = state.rbac_service.find_permission_by_code("call.create").await.unwrap();
    let ghost = Uuid::new_v4();

    let result = state
        .rbac_service
        .assign_permissions(tenant_id, role_id, &[known.id, ghost, ghost])
        .await;
    match result {
        Err(AppError::PermissionsNotFound(missing)) => assert_eq!(missing, vec![ghost]),
        other => panic!("esperava PermissionsNotFound, veio {other:?}"),
    }

    // Ids repetidos e existentes não são falso negativo
    state
        .rbac_service
        .assign_permissions(tenant_id, role_id, &[known.id, known.id])
        .await
        .unwrap();
    let role = state.rbac_service.get_role(tenant_id, role_id).await.unwrap();
    assert_eq!(role.permissions, vec!["call.create".to_string()]);
}

#[tokio::test]
async fn primary_role_cannot_be_deleted() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "InUse").await;
    let (tenant_id, role_id) = (admin.user.tenant_id, admin.user.role_id);
    grant(&state, tenant_id, role_id, &["call.read"]).await;

    let result = state.rbac_service.delete_role(tenant_id, role_id).await;
    assert!(matches!(result, Err(AppError::RoleInUse)));

    let role = state.rbac_service.get_role(tenant_id, role_id).await.unwrap();
    assert_eq!(role.permissions, vec!["call.read".to_string()]);
}

#[tokio::test]
async fn deleting_a_secondary_role_keeps_assignment_history() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "History").await;
    let (tenant_id, user_id) = (admin.user.tenant_id, admin.user.id);

    let temp = state.rbac_service.create_role(tenant_id, "Temporário").await.unwrap();
    grant(&state, tenant_id, temp.role.id, &["call.read"]).await;
    state
        .rbac_service
        .assign_roles_to_user(tenant_id, user_id, &[temp.role.id])
        .await
        .unwrap();

    state.rbac_service.delete_role(tenant_id, temp.role.id).await.unwrap();

    assert!(matches!(
        state.rbac_service.get_role(tenant_id, temp.role.id).await,
        Err(AppError::RoleNotFound)
    ));
    let active = state.rbac_service.get_user_roles(tenant_id, user_id).await.unwrap();
    assert!(active.is_empty());

    let history = state.rbac_service.assignment_history(tenant_id, user_id).await.unwrap();
    let revoked = history.iter().find(|a| a.role_id == temp.role.id).unwrap();
    assert!(!revoked.is_active);
    assert!(revoked.revoked_at.is_some());
}

#[tokio::test]
async fn reassigning_roles_replaces_the_active_set() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Reassign").await;
    let (tenant_id, user_id) = (admin.user.tenant_id, admin.user.id);

    let a = state.rbac_service.create_role(tenant_id, "A").await.unwrap().role.id;
    let b = state.rbac_service.create_role(tenant_id, "B").await.unwrap().role.id;

    let first = state
        .rbac_service
        .assign_roles_to_user(tenant_id, user_id, &[a, b, a])
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    state
        .rbac_service
        .assign_roles_to_user(tenant_id, user_id, &[b])
        .await
        .unwrap();

    let active = state.rbac_service.get_user_roles(tenant_id, user_id).await.unwrap();
    let ids: Vec<Uuid> = active.iter().map(|r| r.role.id).collect();
    assert_eq!(ids, vec![b]);

    // Remover de novo o que já saiu
    let again = state.rbac_service.remove_role(tenant_id, user_id, a).await;
    assert!(matches!(again, Err(AppError::AssignmentNotFound)));

    state.rbac_service.remove_role(tenant_id, user_id, b).await.unwrap();
    assert!(state.rbac_service.get_user_roles(tenant_id, user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn roles_never_resolve_across_tenants() {
    let Some(state) = setup().await else { return };
    let a = register_tenant(&state, "TenantA").await;
    let b = register_tenant(&state, "TenantB").await;
    grant(&state, b.user.tenant_id, b.user.role_id, &["call.create"]).await;

    // Cargo de B consultado no escopo de A
    let decision = state
        .rbac_service
        .authorize(a.user.tenant_id, b.user.role_id, "call.create")
        .await;
    assert!(matches!(decision, Err(AppError::Forbidden(_))));

    assert!(matches!(
        state.rbac_service.get_role(a.user.tenant_id, b.user.role_id).await,
        Err(AppError::RoleNotFound)
    ));

    let cross = state
        .rbac_service
        .assign_roles_to_user(a.user.tenant_id, a.user.id, &[b.user.role_id])
        .await;
    match cross {
        Err(AppError::RolesNotFound(missing)) => assert_eq!(missing, vec![b.user.role_id]),
        other => panic!("esperava RolesNotFound, veio {other:?}"),
    }

    let foreign_user = state.rbac_service.get_user_roles(a.user.tenant_id, b.user.id).await;
    assert!(matches!(foreign_user, Err(AppError::UserNotFound)));
}

#[tokio::test]
async fn granted_permission_cannot_be_deleted() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Catalog").await;

    let code = unique("report.export");
    let permission = state.rbac_service.create_permission(&code, "Exportar").await.unwrap();
    assert!(matches!(
        state.rbac_service.create_permission(&code, "De novo").await,
        Err(AppError::PermissionCodeTaken)
    ));

    state
        .rbac_service
        .assign_permissions(admin.user.tenant_id, admin.user.role_id, &[permission.id])
        .await
        .unwrap();
    assert!(matches!(
        state.rbac_service.delete_permission(permission.id).await,
        Err(AppError::PermissionInUse)
    ));

    state
        .rbac_service
        .assign_permissions(admin.user.tenant_id, admin.user.role_id, &[])
        .await
        .unwrap();
    state.rbac_service.delete_permission(permission.id).await.unwrap();
    assert!(matches!(
        state.rbac_service.get_permission(permission.id).await,
        Err(AppError::PermissionNotFound)
    ));
}

#[tokio::test]
async fn platform_codes_are_refused_and_existing_ones_survive_replacement() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Escalate").await;
    let (tenant_id, role_id) = (admin.user.tenant_id, admin.user.role_id);
    let rbac = &state.rbac_service;

    let plan_create = rbac.find_permission_by_code("admin.plan.create").await.unwrap();
    let call_read = rbac.find_permission_by_code("call.read").await.unwrap();

    // Pela rota de tenant, nem misturado com códigos comuns
    let result = rbac.assign_permissions(tenant_id, role_id, &[call_read.id, plan_create.id]).await;
    match result {
        Err(AppError::PlatformPermissions(codes)) => assert_eq!(codes, vec!["admin.plan.create".to_string()]),
        other => panic!("esperava PlatformPermissions, veio {other:?}"),
    }
    assert!(matches!(
        rbac.grant_permission(tenant_id, role_id, plan_create.id).await,
        Err(AppError::PlatformPermissions(_))
    ));
    assert!(matches!(
        rbac.authorize(tenant_id, role_id, "admin.plan.create").await,
        Err(AppError::Forbidden(_))
    ));

    // Concessão fora das rotas (inicialização) e depois substituição pelo tenant
    let granted = rbac.grant_platform_permissions(&admin.user.username).await.unwrap();
    assert!(granted > 0);
    grant(&state, tenant_id, role_id, &["call.read"]).await;

    let role = rbac.get_role(tenant_id, role_id).await.unwrap();
    assert!(role.permissions.contains(&"call.read".to_string()));
    assert!(role.permissions.contains(&"admin.plan.create".to_string()));
    assert!(!role.permissions.contains(&"role.manage".to_string()));
}

#[tokio::test]
async fn user_without_grants_cannot_grant_itself_over_http() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "ZeroGrant").await;
    let (tenant_id, role_id) = (admin.user.tenant_id, admin.user.role_id);

    // Cargo esvaziado: nenhum código
    grant(&state, tenant_id, role_id, &[]).await;
    let plan_create = state.rbac_service.find_permission_by_code("admin.plan.create").await.unwrap();
    let role_manage = state.rbac_service.find_permission_by_code("role.manage").await.unwrap();

    let app = routes::app(state.clone());
    let req = Request::post(format!("/api/v1/roles/{role_id}/permissions"))
        .header(header::AUTHORIZATION, format!("Bearer {}", admin.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "permissionIds": [plan_create.id, role_manage.id] }).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "forbidden");

    // A concessão avulsa também está fechada
    let req = Request::post("/api/v1/permissions/assign")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "roleId": role_id, "permissionId": role_manage.id }).to_string(),
        ))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let role = state.rbac_service.get_role(tenant_id, role_id).await.unwrap();
    assert!(role.permissions.is_empty());
}

#[tokio::test]
async fn granting_one_permission_adds_without_replacing() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Incremental").await;
    let other = register_tenant(&state, "Elsewhere").await;
    let tenant_id = admin.user.tenant_id;
    let rbac = &state.rbac_service;

    let operator = rbac.create_role(tenant_id, "Operador").await.unwrap().role.id;
    let call_read = rbac.find_permission_by_code("call.read").await.unwrap();
    let call_create = rbac.find_permission_by_code("call.create").await.unwrap();

    rbac.grant_permission(tenant_id, operator, call_read.id).await.unwrap();
    let again = rbac.grant_permission(tenant_id, operator, call_read.id).await.unwrap();
    assert_eq!(again.permissions, vec!["call.read".to_string()]);

    let role = rbac.grant_permission(tenant_id, operator, call_create.id).await.unwrap();
    assert_eq!(role.permissions, vec!["call.create".to_string(), "call.read".to_string()]);

    assert!(matches!(
        rbac.grant_permission(tenant_id, operator, Uuid::new_v4()).await,
        Err(AppError::PermissionsNotFound(_))
    ));
    assert!(matches!(
        rbac.grant_permission(other.user.tenant_id, operator, call_read.id).await,
        Err(AppError::RoleNotFound)
    ));
}

#[tokio::test]
async fn concurrent_reassignments_leave_one_active_set() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Racing").await;
    let (tenant_id, user_id) = (admin.user.tenant_id, admin.user.id);

    let a = state.rbac_service.create_role(tenant_id, "A").await.unwrap().role.id;
    let b = state.rbac_service.create_role(tenant_id, "B").await.unwrap().role.id;

    for _ in 0..20 {
        let mut handles = Vec::new();
        for role in [a, b] {
            let rbac = state.rbac_service.clone();
            handles.push(tokio::spawn(async move {
                rbac.assign_roles_to_user(tenant_id, user_id, &[role]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let active = state.rbac_service.get_user_roles(tenant_id, user_id).await.unwrap();
        assert_eq!(active.len(), 1, "duas redefinições deixaram {} cargos ativos", active.len());
    }
}

#[tokio::test]
async fn deleting_the_last_user_unblocks_role_and_tenant_deletion() {
    let Some(state) = setup().await else { return };
    let admin = register_tenant(&state, "Teardown").await;
    let (tenant_id, role_id, user_id) = (admin.user.tenant_id, admin.user.role_id, admin.user.id);

    // 1. Com o usuário vivo, cargo e tenant estão presos
    assert!(matches!(
        state.rbac_service.delete_role(tenant_id, role_id).await,
        Err(AppError::RoleInUse)
    ));

    // 2. Exclui o usuário; vínculo e atribuições vão junto
    state.user_service.delete_user(tenant_id, user_id).await.unwrap();
    assert!(matches!(
        state.user_service.get_user(tenant_id, user_id).await,
        Err(AppError::UserNotFound)
    ));
    assert!(matches!(
        state.user_service.delete_user(tenant_id, user_id).await,
        Err(AppError::UserNotFound)
    ));
    assert!(state.tenant_service.list_members(tenant_id).await.unwrap().is_empty());
    assert!(matches!(
        state.auth_service.login(&admin.user.username, PASSWORD).await,
        Err(AppError::InvalidCredentials)
    ));

    // 3. Cargo e tenant saem
    state.rbac_service.delete_role(tenant_id, role_id).await.unwrap();
    state.tenant_service.delete_tenant(tenant_id).await.unwrap();
    assert!(matches!(
        state.tenant_service.get_tenant(tenant_id).await,
        Err(AppError::TenantNotFound)
    ));
}

#[tokio::test]
async fn members_from_another_tenant_are_listed_but_not_deleted() {
    let Some(state) = setup().await else { return };
    let home = register_tenant(&state, "Host").await;
    let guest = register_tenant(&state, "Visitor").await;
    let tenant_id = home.user.tenant_id;

    let plan = create_plan(&state, 5, 5).await;
    state.subscription_service.subscribe(tenant_id, plan.id).await.unwrap();
    state.tenant_service.add_member(tenant_id, guest.user.id).await.unwrap();

    let users = state.user_service.list_users(tenant_id).await.unwrap();
    let ids: BTreeSet<Uuid> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, BTreeSet::from([home.user.id, guest.user.id]));

    let found = state.user_service.get_user(tenant_id, guest.user.id).await.unwrap();
    assert_eq!(found.tenant_id, guest.user.tenant_id);

    assert!(matches!(
        state.user_service.delete_user(tenant_id, guest.user.id).await,
        Err(AppError::ForeignUser)
    ));

    // Fora do tenant: nem lista nem consulta
    let outsider = register_tenant(&state, "Outsider").await;
    assert!(matches!(
        state.user_service.get_user(tenant_id, outsider.user.id).await,
        Err(AppError::UserNotFound)
    ));
}
