//! Steps shared by several suites: seed-account logins and the list
//! captures dependent steps feed on.

use serde_json::json;

use super::{
    expect_array, expect_status, field_str, require, require_field, require_str, StepFuture,
    StepOutcome,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;

/// Authenticate the seeded priest and keep the token for later steps.
pub fn priest_login<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let account = ctx.config.accounts.priest.clone();
        let body = json!({
            "email": account.email,
            "password": account.password,
        });

        let res = expect_status(api.post("/auth/login", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;
        let user = require_field(&res, "user")?;

        if field_str(&user, "role").as_deref() != Some("priest") {
            return Err(StepOutcome::fail(format!(
                "expected role priest, got {}",
                field_str(&user, "role").unwrap_or_else(|| "<none>".to_string())
            )));
        }

        ctx.priest_token = Some(token);
        ctx.priest_user = Some(user);
        Ok(format!("logged in as {}", account.email))
    })
}

/// Authenticate the seeded faithful account.
pub fn faithful_login<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let account = ctx.config.accounts.faithful.clone();
        let body = json!({
            "email": account.email,
            "password": account.password,
        });

        let res = expect_status(api.post("/auth/login", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;
        let user = require_field(&res, "user")?;

        if field_str(&user, "role").as_deref() != Some("faithful") {
            return Err(StepOutcome::fail(format!(
                "expected role faithful, got {}",
                field_str(&user, "role").unwrap_or_else(|| "<none>".to_string())
            )));
        }

        ctx.faithful_token = Some(token);
        ctx.faithful_user = Some(user);
        Ok(format!("logged in as {}", account.email))
    })
}

/// Authenticate the seeded bishop account.
pub fn bishop_login<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let account = ctx.config.accounts.bishop.clone();
        let body = json!({
            "email": account.email,
            "password": account.password,
        });

        let res = expect_status(api.post("/auth/login", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;
        require_field(&res, "user")?;

        ctx.bishop_token = Some(token);
        Ok(format!("logged in as {}", account.email))
    })
}

/// Capture the priest's bands so later steps can pick real targets.
pub fn capture_priest_bands<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;

        let res = expect_status(
            api.get("/confession-bands/my-bands", Some(&token)).await,
            200,
        )?;
        ctx.existing_bands = expect_array(&res)?;
        Ok(format!("{} existing bands", ctx.existing_bands.len()))
    })
}

/// Capture the faithful's confessions, booked and otherwise.
pub fn capture_faithful_confessions<'a>(
    api: &'a ApiClient,
    ctx: &'a mut RunContext,
) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;

        let res = expect_status(api.get("/confessions", Some(&token)).await, 200)?;
        ctx.existing_confessions = expect_array(&res)?;
        Ok(format!(
            "{} existing confessions",
            ctx.existing_confessions.len()
        ))
    })
}

/// Anyone may browse open slots; no token on purpose.
pub fn list_available_slots<'a>(api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let res = expect_status(api.get("/confession-slots/available", None).await, 200)?;
        let slots = expect_array(&res)?;
        Ok(format!("{} slots available", slots.len()))
    })
}
