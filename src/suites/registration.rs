//! Priest onboarding: bishop invitations, invite-token registration,
//! direct applications and the bishop approval queue.

use serde_json::json;

use super::{
    expect_status, field_str, require, require_field, require_str, unique_email, Step, StepFuture,
    StepOutcome, Suite,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::common;

pub fn suite() -> Suite {
    Suite {
        name: "registration",
        description: "Priest invitations, applications and bishop approval",
        steps: vec![
            Step::new("Bishop Login", common::bishop_login),
            Step::new("Create Invitation", create_invitation),
            Step::new("Validate Invite Token", validate_invite_token),
            Step::new("Register From Invitation", register_from_invitation),
            Step::new("Direct Priest Application", direct_priest_application),
            Step::new("Email Uniqueness", email_uniqueness),
            Step::new("Reject Priest Application", reject_priest_application),
            Step::new("Approve Priest", approve_priest),
        ],
    }
}

/// Bishop issues a priest invitation for a fresh address.
pub fn create_invitation<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.bishop_token, "bishop token")?;
        let email = unique_email("nuevo.sacerdote", "parroquia.com");
        let body = json!({
            "email": email,
            "role": "priest",
            "dioceseId": ctx.config.diocese_id,
            "message": "Te invitamos a unirte como sacerdote a nuestra diócesis",
        });

        let res = expect_status(api.post("/invites", &body, Some(&token)).await, 201)?;
        require_str(&res, "id")?;
        require_str(&res, "token")?;
        Ok(format!("invitation created for {}", email))
    })
}

/// The seeded invite token resolves to its email and role.
pub fn validate_invite_token<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let path = format!("/invites/by-token/{}", ctx.config.invite_token);
        let res = expect_status(api.get(&path, None).await, 200)?;
        let email = require_str(&res, "email")?;
        let role = require_str(&res, "role")?;
        Ok(format!("token resolves to {} as {}", email, role))
    })
}

/// Registration through the seeded invite issues a session immediately.
pub fn register_from_invitation<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let path = format!("/auth/register-from-invite/{}", ctx.config.invite_token);
        let body = json!({
            "password": "TestPassword123",
            "firstName": "Padre Invitado",
            "lastName": "González",
            "phone": "+34600111222",
            "bio": "Sacerdote con experiencia pastoral",
            "specialties": ["Matrimonios", "Jóvenes"],
            "languages": ["Español", "Inglés"],
        });

        let res = expect_status(api.post(&path, &body, None).await, 201)?;
        require_str(&res, "access_token")?;
        let user = require_field(&res, "user")?;
        Ok(format!(
            "registered {}",
            field_str(&user, "email").unwrap_or_else(|| "invited priest".to_string())
        ))
    })
}

/// Direct applications land in the approval queue without a session.
pub fn direct_priest_application<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let email = unique_email("padre.directo", "ejemplo.com");
        let body = json!({
            "email": email,
            "password": "TestPassword123",
            "firstName": "Padre Directo",
            "lastName": "Martínez",
            "phone": "+34600333444",
            "dioceseId": ctx.config.diocese_id,
            "bio": "Sacerdote solicitando aprobación",
            "specialties": ["Confesiones"],
            "languages": ["Español"],
        });

        let res = expect_status(api.post("/auth/register-priest", &body, None).await, 201)?;
        if res.bool_field("success") != Some(true) {
            return Err(StepOutcome::fail(format!(
                "application not acknowledged: {}",
                res.detail()
            )));
        }
        let user = require_field(&res, "user")?;
        ctx.pending_priest = Some(user);
        Ok(format!("application submitted for {}", email))
    })
}

/// Bishop approves the application created above.
pub fn approve_priest<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.bishop_token, "bishop token")?;
        let pending = require(&ctx.pending_priest, "pending priest application")?;
        let Some(id) = field_str(&pending, "id") else {
            return Err(StepOutcome::fail("pending priest record has no id"));
        };

        let path = format!("/auth/approve-priest/{}", id);
        let res = expect_status(
            api.patch(&path, &json!({"approved": true}), Some(&token)).await,
            200,
        )?;
        if res.bool_field("success") != Some(true) {
            return Err(StepOutcome::fail(format!(
                "approval not acknowledged: {}",
                res.detail()
            )));
        }
        Ok("priest approved".to_string())
    })
}

/// A second throwaway application, rejected instead of approved.
pub fn reject_priest_application<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.bishop_token, "bishop token")?;

        let email = unique_email("padre.rechazo", "ejemplo.com");
        let body = json!({
            "email": email,
            "password": "TestPassword123",
            "firstName": "Padre Rechazado",
            "lastName": "Pérez",
            "phone": "+34600555666",
            "dioceseId": ctx.config.diocese_id,
            "bio": "Solicitud destinada al rechazo",
            "specialties": ["Confesiones"],
            "languages": ["Español"],
        });

        let res = expect_status(api.post("/auth/register-priest", &body, None).await, 201)?;
        let user = require_field(&res, "user")?;
        let Some(id) = field_str(&user, "id") else {
            return Err(StepOutcome::fail("application record has no id"));
        };

        let path = format!("/auth/approve-priest/{}", id);
        let res = expect_status(
            api.patch(&path, &json!({"approved": false}), Some(&token)).await,
            200,
        )?;
        if res.bool_field("success") != Some(true) {
            return Err(StepOutcome::fail(format!(
                "rejection not acknowledged: {}",
                res.detail()
            )));
        }
        Ok(format!("application for {} rejected", email))
    })
}

/// Registering a priest under an already-taken email must be refused.
pub fn email_uniqueness<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let taken = ctx.config.accounts.bishop.email.clone();
        let body = json!({
            "email": taken,
            "password": "TestPassword123",
            "firstName": "Duplicado",
            "lastName": "Duplicado",
            "phone": "+34600777888",
            "dioceseId": ctx.config.diocese_id,
            "bio": "Correo duplicado",
            "specialties": ["Confesiones"],
            "languages": ["Español"],
        });

        expect_status(api.post("/auth/register-priest", &body, None).await, 401)?;
        Ok(format!("duplicate email {} rejected", taken))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::canned::CannedTransport;
    use crate::suites::outcome_of;
    use crate::utils::config::HarnessConfig;
    use std::sync::Arc;

    fn context() -> RunContext {
        RunContext::new(HarnessConfig::default())
    }

    #[tokio::test]
    async fn invitation_needs_the_bishop_token() {
        let transport = Arc::new(CannedTransport::new());
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();

        let outcome = outcome_of(create_invitation(&api, &mut ctx).await);
        assert_eq!(
            outcome,
            StepOutcome::fail("missing precondition: bishop token")
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn application_captures_the_pending_record() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(
            201,
            json!({
                "success": true,
                "user": {"id": "pending-1", "isActive": false, "role": "priest"}
            }),
        );
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();

        let outcome = outcome_of(direct_priest_application(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(
            ctx.pending_priest
                .as_ref()
                .and_then(|u| field_str(u, "id"))
                .as_deref(),
            Some("pending-1")
        );
    }

    #[tokio::test]
    async fn approval_hits_the_captured_application() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"success": true}));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.bishop_token = Some("jwt-bishop".to_string());
        ctx.pending_priest = Some(json!({"id": "pending-1"}));

        let outcome = outcome_of(approve_priest(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(
            transport.requests(),
            vec![(
                "PATCH".to_string(),
                "/auth/approve-priest/pending-1".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn duplicate_email_passes_only_on_401() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(401, json!({"message": "El email ya está registrado"}));
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();

        let outcome = outcome_of(email_uniqueness(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);

        // a 201 here means the uniqueness check is broken
        let transport = Arc::new(CannedTransport::new());
        transport.push(201, json!({"success": true, "user": {"id": "x"}}));
        let api = ApiClient::with_transport(transport);
        let outcome = outcome_of(email_uniqueness(&api, &mut ctx).await);
        match outcome {
            StepOutcome::Failed { detail } => {
                assert!(detail.contains("expected 401"));
                assert!(detail.contains("got 201"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
