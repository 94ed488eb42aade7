//! Confession band diagnosis: creation, validation, deletion and the
//! band-backed booking path that historically broke.

use serde_json::json;

use super::{
    expect_status, field_str, require, require_str, Step, StepFuture, StepOutcome, Suite,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::common;
use crate::utils::time::{to_iso, tomorrow_at, yesterday_at};

pub fn suite() -> Suite {
    Suite {
        name: "bands",
        description: "Band creation, validation, deletion and band bookings",
        steps: vec![
            Step::new("Priest Login", common::priest_login),
            Step::new("Faithful Login", common::faithful_login),
            Step::new("List My Bands", common::capture_priest_bands),
            Step::new("List Available Slots", common::list_available_slots),
            Step::new("Create Band", create_band),
            Step::new("Reject Past Start Time", reject_past_start_time),
            Step::new("List Faithful Confessions", common::capture_faithful_confessions),
            Step::new("Delete Band", delete_band),
            Step::critical("Book From Band", book_from_band),
        ],
    }
}

fn create_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let body = json!({
            "startTime": to_iso(&tomorrow_at(10)),
            "endTime": to_iso(&tomorrow_at(11)),
            "location": "Confesionario Principal",
            "maxCapacity": 5,
            "notes": "Franja de diagnóstico",
            "isRecurrent": false,
        });

        let res = expect_status(api.post("/confession-bands", &body, Some(&token)).await, 201)?;
        let id = require_str(&res, "id")?;

        ctx.band_id = Some(id.clone());
        Ok(format!("band created: {}", id))
    })
}

/// Past-dated bands must be refused. An accepted one is a validation
/// hole, worth distinguishing from other wrong statuses.
fn reject_past_start_time<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let body = json!({
            "startTime": to_iso(&yesterday_at(10)),
            "endTime": to_iso(&yesterday_at(11)),
            "location": "Confesionario Principal",
            "maxCapacity": 5,
            "isRecurrent": false,
        });

        let Some(res) = api.post("/confession-bands", &body, Some(&token)).await else {
            return Err(StepOutcome::fail("no response from server"));
        };
        match res.status {
            400 => Ok("past start time rejected".to_string()),
            201 => Err(StepOutcome::fail(
                "a past-dated band was accepted; validation is not running",
            )),
            other => Err(StepOutcome::fail(format!(
                "expected 400, got {}: {}",
                other,
                res.detail()
            ))),
        }
    })
}

/// Delete the band created above, or the first pre-existing one.
fn delete_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let id = ctx
            .band_id
            .clone()
            .or_else(|| ctx.existing_bands.first().and_then(|b| field_str(b, "id")));
        let Some(id) = id else {
            return Err(StepOutcome::missing("a band to delete"));
        };

        let path = format!("/confession-bands/my-bands/{}", id);
        let res = expect_status(api.delete(&path, Some(&token)).await, 200)?;
        if !res.has_field("message") {
            return Err(StepOutcome::fail(format!(
                "no confirmation message: {}",
                res.detail()
            )));
        }

        if ctx.band_id.as_deref() == Some(id.as_str()) {
            ctx.band_id = None;
        }
        Ok(format!("band {} deleted", id))
    })
}

/// Booking against a band instead of a slot. This is the path that used
/// to blow up on the slot foreign key, hence critical.
fn book_from_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let Some(band) = ctx.existing_bands.first().cloned() else {
            return Err(StepOutcome::missing("an existing band to book"));
        };
        let Some(band_id) = field_str(&band, "id") else {
            return Err(StepOutcome::fail("band record has no id"));
        };

        let body = json!({"confessionBandId": band_id});
        let res = expect_status(api.post("/confessions", &body, Some(&token)).await, 201)?;
        let id = require_str(&res, "id")?;

        ctx.confession_id = Some(id.clone());
        Ok(format!("confession booked from band: {}", id))
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
    async fn past_date_rejection_passes_on_400() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(
            400,
            json!({"message": "La fecha de inicio debe ser futura"}),
        );
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();
        ctx.priest_token = Some("jwt".to_string());

        let outcome = outcome_of(reject_past_start_time(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
    }

    #[tokio::test]
    async fn accepted_past_date_is_called_out() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(201, json!({"id": "band-bad"}));
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();
        ctx.priest_token = Some("jwt".to_string());

        let outcome = outcome_of(reject_past_start_time(&api, &mut ctx).await);
        match outcome {
            StepOutcome::Failed { detail } => assert!(detail.contains("validation")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_falls_back_to_an_existing_band() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"message": "Franja eliminada correctamente"}));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();
        ctx.priest_token = Some("jwt".to_string());
        ctx.existing_bands = vec![json!({"id": "band-7"})];

        let outcome = outcome_of(delete_band(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(
            transport.requests(),
            vec![(
                "DELETE".to_string(),
                "/confession-bands/my-bands/band-7".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn band_booking_surfaces_server_errors() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(
            500,
            json!({"message": "null value in column \"confessionSlotId\" violates not-null constraint"}),
        );
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();
        ctx.faithful_token = Some("jwt".to_string());
        ctx.existing_bands = vec![json!({"id": "band-1"})];

        let outcome = outcome_of(book_from_band(&api, &mut ctx).await);
        match outcome {
            StepOutcome::Failed { detail } => {
                assert!(detail.contains("got 500"));
                assert!(detail.contains("not-null"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn band_booking_passes_when_created() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(201, json!({"id": "conf-9", "status": "booked"}));
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();
        ctx.faithful_token = Some("jwt".to_string());
        ctx.existing_bands = vec![json!({"id": "band-1"})];

        let outcome = outcome_of(book_from_band(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
        assert_eq!(ctx.confession_id.as_deref(), Some("conf-9"));
    }
}
