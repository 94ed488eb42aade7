//! Focused diagnosis of the two cancellation paths frequently reported
//! broken: deleting a published band and cancelling a booked confession.

use serde_json::json;

use super::{
    expect_body_status, expect_status, field_str, require, require_str, Step, StepFuture,
    StepOutcome, Suite,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::common;
use crate::utils::time::{to_iso, tomorrow_at};

pub fn suite() -> Suite {
    Suite {
        name: "cancellation",
        description: "Band deletion and confession cancellation",
        steps: vec![
            Step::new("Priest Login", common::priest_login),
            Step::new("Faithful Login", common::faithful_login),
            Step::new("List My Bands", common::capture_priest_bands),
            Step::new("List Faithful Confessions", common::capture_faithful_confessions),
            Step::new("Seed Test Data", seed_test_data),
            Step::critical("Delete First Band", delete_first_band),
            Step::critical("Cancel Booked Confession", cancel_booked_confession),
        ],
    }
}

fn has_booked_confession(ctx: &RunContext) -> bool {
    ctx.existing_confessions
        .iter()
        .any(|c| field_str(c, "status").as_deref() == Some("booked"))
}

/// Make sure both targets exist: at least one band to delete and one
/// booked confession to cancel. Reuses live data when there is any.
fn seed_test_data<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let priest_token = require(&ctx.priest_token, "priest token")?;
        let faithful_token = require(&ctx.faithful_token, "faithful token")?;

        if !ctx.existing_bands.is_empty() && has_booked_confession(ctx) {
            return Ok("existing data is sufficient".to_string());
        }

        let body = json!({
            "startTime": to_iso(&tomorrow_at(16)),
            "endTime": to_iso(&tomorrow_at(17)),
            "location": "Confesionario Principal",
            "maxCapacity": 2,
            "notes": "Datos de prueba para el diagnóstico",
            "isRecurrent": false,
        });
        let res = expect_status(
            api.post("/confession-bands", &body, Some(&priest_token)).await,
            201,
        )?;
        let band_id = require_str(&res, "id")?;
        ctx.existing_bands.push(res.body.clone());

        let booking = json!({"confessionBandId": band_id});
        let res = expect_status(
            api.post("/confessions", &booking, Some(&faithful_token)).await,
            201,
        )?;
        ctx.existing_confessions.push(res.body.clone());

        Ok("created a band and a booking".to_string())
    })
}

fn delete_first_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let Some(id) = ctx.existing_bands.first().and_then(|b| field_str(b, "id")) else {
            return Err(StepOutcome::missing("a band to delete"));
        };

        let path = format!("/confession-bands/my-bands/{}", id);
        expect_status(api.delete(&path, Some(&token)).await, 200)?;
        Ok(format!("band {} deleted", id))
    })
}

/// Cancel the first confession still in booked state and make sure the
/// transition was persisted, not just acknowledged.
fn cancel_booked_confession<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let target = ctx
            .existing_confessions
            .iter()
            .find(|c| field_str(c, "status").as_deref() == Some("booked"))
            .and_then(|c| field_str(c, "id"));
        let Some(id) = target else {
            return Err(StepOutcome::fail("no booked confession available to cancel"));
        };

        let path = format!("/confessions/{}/cancel", id);
        let res = expect_status(api.patch(&path, &json!({}), Some(&token)).await, 200)?;
        expect_body_status(&res, "cancelled")?;
        Ok(format!("confession {} cancelled", id))
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
    async fn cancel_passes_when_the_status_flips() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"id": "c-1", "status": "cancelled"}));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.faithful_token = Some("jwt".to_string());
        ctx.existing_confessions = vec![json!({"id": "c-1", "status": "booked"})];

        let outcome = outcome_of(cancel_booked_confession(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(
            transport.requests(),
            vec![("PATCH".to_string(), "/confessions/c-1/cancel".to_string())]
        );
    }

    #[tokio::test]
    async fn cancel_fails_when_the_status_stays_booked() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"id": "c-1", "status": "booked"}));
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();
        ctx.faithful_token = Some("jwt".to_string());
        ctx.existing_confessions = vec![json!({"id": "c-1", "status": "booked"})];

        let outcome = outcome_of(cancel_booked_confession(&api, &mut ctx).await);
        match outcome {
            StepOutcome::Failed { detail } => {
                assert!(detail.contains("not updated to cancelled"));
                assert!(detail.contains("booked"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancel_without_a_token_never_reaches_the_network() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"id": "c-1", "status": "cancelled"}));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.existing_confessions = vec![json!({"id": "c-1", "status": "booked"})];

        let outcome = outcome_of(cancel_booked_confession(&api, &mut ctx).await);
        assert_eq!(
            outcome,
            StepOutcome::fail("missing precondition: faithful token")
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn already_cancelled_confessions_are_not_targets() {
        let transport = Arc::new(CannedTransport::new());
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.faithful_token = Some("jwt".to_string());
        ctx.existing_confessions = vec![
            json!({"id": "c-1", "status": "cancelled"}),
            json!({"id": "c-2", "status": "completed"}),
        ];

        let outcome = outcome_of(cancel_booked_confession(&api, &mut ctx).await);
        match outcome {
            StepOutcome::Failed { detail } => assert!(detail.contains("no booked confession")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn seeding_reuses_live_data() {
        let transport = Arc::new(CannedTransport::new());
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.priest_token = Some("jwt-p".to_string());
        ctx.faithful_token = Some("jwt-f".to_string());
        ctx.existing_bands = vec![json!({"id": "band-1"})];
        ctx.existing_confessions = vec![json!({"id": "c-1", "status": "booked"})];

        let outcome = outcome_of(seed_test_data(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn seeding_creates_what_is_missing() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(201, json!({"id": "band-new", "location": "Confesionario Principal"}));
        transport.push(201, json!({"id": "c-new", "status": "booked"}));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.priest_token = Some("jwt-p".to_string());
        ctx.faithful_token = Some("jwt-f".to_string());

        let outcome = outcome_of(seed_test_data(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(ctx.existing_bands.len(), 1);
        assert!(has_booked_confession(&ctx));
        assert_eq!(transport.request_count(), 2);
    }
}
