//! Deleting a band that already has bookings. The delete used to fail on
//! the booking foreign key; these steps pin the fixed behavior: the band
//! goes away and its bookings survive, detached.

use serde_json::{json, Value};

use super::{
    expect_array, expect_body_status, expect_status, field_str, require, require_str, Step,
    StepFuture, StepOutcome, Suite,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::common;
use crate::utils::time::{to_iso, tomorrow_at};

pub fn suite() -> Suite {
    Suite {
        name: "delete-band",
        description: "Deleting booked bands must detach bookings, not error",
        steps: vec![
            Step::new("Priest Login", common::priest_login),
            Step::new("Faithful Login", common::faithful_login),
            Step::new("List My Bands", common::capture_priest_bands),
            Step::new("Create Test Band", create_test_band),
            Step::new("Create Multiple Bookings", create_multiple_bookings),
            Step::new("Cancel First Booking", cancel_first_booking),
            Step::critical("Delete Band With Bookings", delete_band_with_bookings),
            Step::critical("Verify Bookings Detached", verify_bookings_detached),
            Step::new("Delete Existing Band With Bookings", delete_existing_band),
        ],
    }
}

fn create_test_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let body = json!({
            "startTime": to_iso(&tomorrow_at(16)),
            "endTime": to_iso(&tomorrow_at(17)),
            "location": "Confesionario Principal",
            "maxCapacity": 3,
            "notes": "Franja para la prueba de borrado",
            "isRecurrent": false,
        });

        let res = expect_status(api.post("/confession-bands", &body, Some(&token)).await, 201)?;
        let id = require_str(&res, "id")?;

        ctx.band_id = Some(id.clone());
        Ok(format!("band created: {}", id))
    })
}

/// Fill the band with bookings so the delete has something to trip on.
/// Two of three is enough to make the scenario real.
fn create_multiple_bookings<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let band_id = require(&ctx.band_id, "test band id")?;

        let mut created = Vec::new();
        for _ in 0..3 {
            let body = json!({"confessionBandId": band_id});
            if let Some(res) = api.post("/confessions", &body, Some(&token)).await {
                if res.status == 201 {
                    if let Some(id) = res.str_field("id") {
                        created.push(id.to_string());
                    }
                }
            }
        }

        let count = created.len();
        ctx.booking_ids = created;
        if count >= 2 {
            Ok(format!("{} bookings created on the band", count))
        } else {
            Err(StepOutcome::fail(format!(
                "only {} of 3 bookings were created",
                count
            )))
        }
    })
}

/// One booking goes to cancelled state before the delete, so the delete
/// has to cope with mixed booking states.
fn cancel_first_booking<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let Some(id) = ctx.booking_ids.first().cloned() else {
            return Err(StepOutcome::missing("a booking to cancel"));
        };

        let path = format!("/confessions/{}/cancel", id);
        let res = expect_status(api.patch(&path, &json!({}), Some(&token)).await, 200)?;
        expect_body_status(&res, "cancelled")?;
        Ok(format!("booking {} cancelled", id))
    })
}

fn delete_band_with_bookings<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let id = require(&ctx.band_id, "test band id")?;

        let path = format!("/confession-bands/my-bands/{}", id);
        let res = expect_status(api.delete(&path, Some(&token)).await, 200)?;
        if !res.has_field("message") {
            return Err(StepOutcome::fail(format!(
                "no confirmation message: {}",
                res.detail()
            )));
        }
        Ok(format!("band {} deleted with live bookings", id))
    })
}

/// The surviving bookings must no longer point at the deleted band.
fn verify_bookings_detached<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        if ctx.booking_ids.is_empty() {
            return Err(StepOutcome::missing("bookings from the delete test"));
        }

        let res = expect_status(api.get("/confessions", Some(&token)).await, 200)?;
        let all = expect_array(&res)?;

        let mine: Vec<&Value> = all
            .iter()
            .filter(|c| {
                field_str(c, "id").map_or(false, |id| ctx.booking_ids.contains(&id))
            })
            .collect();
        if mine.is_empty() {
            return Ok("test bookings are no longer listed".to_string());
        }

        let detached = mine
            .iter()
            .filter(|c| c.get("confessionBandId").map_or(true, Value::is_null))
            .count();
        if detached == mine.len() {
            Ok(format!("{} bookings detached from the deleted band", detached))
        } else {
            Err(StepOutcome::fail(format!(
                "{} of {} bookings still reference the deleted band",
                mine.len() - detached,
                mine.len()
            )))
        }
    })
}

/// Same delete against a pre-existing booked band, when the seed data has
/// one. Nothing to exercise is a skip, not a failure.
fn delete_existing_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;

        let candidate = ctx
            .existing_bands
            .iter()
            .find(|b| has_bookings(b))
            .and_then(|b| field_str(b, "id"));
        let Some(id) = candidate else {
            return Err(StepOutcome::skip("no existing band with bookings"));
        };

        let path = format!("/confession-bands/my-bands/{}", id);
        expect_status(api.delete(&path, Some(&token)).await, 200)?;
        Ok(format!("existing band {} deleted", id))
    })
}

fn has_bookings(band: &Value) -> bool {
    band.get("currentBookings")
        .and_then(Value::as_u64)
        .unwrap_or(0)
        > 0
        || band
            .get("confessions")
            .and_then(Value::as_array)
            .map_or(false, |c| !c.is_empty())
}
