// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

/// Router completo da aplicação (usado pelo main e pelos testes).
pub fn app(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let public_routes = Router::new()
        .route("/auth/register-tenant", post(handlers::auth::register_tenant))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout));

    // Todo o resto exige token válido; tenant, permissão e cota ficam nos extratores de cada handler
    let protected_routes = Router::new()
        .route("/auth/profile", get(handlers::auth::profile))
        // Usuários do tenant
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route(
            "/users/{user_id}",
            get(handlers::users::get_user).delete(handlers::users::delete_user),
        )
        // Cargos e permissões
        .route(
            "/roles",
            post(handlers::rbac::create_role).get(handlers::rbac::list_roles),
        )
        .route(
            "/roles/{role_id}",
            get(handlers::rbac::get_role).delete(handlers::rbac::delete_role),
        )
        .route("/roles/{role_id}/permissions", post(handlers::rbac::assign_permissions))
        .route("/permissions/assign", post(handlers::rbac::grant_permission))
        .route(
            "/permissions",
            post(handlers::rbac::create_permission).get(handlers::rbac::list_permissions),
        )
        .route(
            "/permissions/{permission_id}",
            get(handlers::rbac::get_permission).delete(handlers::rbac::delete_permission),
        )
        // Cargos de usuários
        .route(
            "/user-roles/{user_id}/roles",
            post(handlers::rbac::assign_roles).get(handlers::rbac::get_user_roles),
        )
        .route(
            "/user-roles/{user_id}/roles/{role_id}",
            delete(handlers::rbac::remove_user_role),
        )
        .route("/user-roles/{user_id}/history", get(handlers::rbac::get_user_role_history))
        // Membros
        .route(
            "/members",
            post(handlers::tenancy::add_member).get(handlers::tenancy::list_members),
        )
        .route("/members/{user_id}", delete(handlers::tenancy::remove_member))
        // Chamadas (recurso medido)
        .route(
            "/calls",
            post(handlers::calls::create_call).get(handlers::calls::list_calls),
        )
        .route(
            "/calls/{call_id}",
            get(handlers::calls::get_call).delete(handlers::calls::delete_call),
        )
        // Assinatura e consumo do tenant
        .route("/subscription", get(handlers::subscription::get_subscription))
        .route("/subscription/history", get(handlers::subscription::get_subscription_history))
        .route("/usage", get(handlers::subscription::get_usage))
        // Administração da plataforma
        .route(
            "/admin/tenants",
            post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_tenants),
        )
        .route(
            "/admin/tenants/{tenant_id}",
            get(handlers::tenancy::get_tenant).delete(handlers::tenancy::delete_tenant),
        )
        .route(
            "/admin/tenants/{tenant_id}/subscribe",
            post(handlers::subscription::subscribe_tenant),
        )
        .route(
            "/admin/plans",
            post(handlers::subscription::create_plan).get(handlers::subscription::list_plans),
        )
        .route(
            "/admin/plans/{plan_id}",
            get(handlers::subscription::get_plan).delete(handlers::subscription::delete_plan),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .with_state(app_state)
}
