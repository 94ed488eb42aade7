//! The band booking lifecycle from both sides: the priest publishing and
//! maintaining a band, the faithful booking into it and backing out.

use serde_json::json;

use super::{
    expect_array, expect_status, require, require_str, Step, StepFuture, StepOutcome, Suite,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::common;
use crate::utils::time::{to_iso, tomorrow_at};

pub fn suite() -> Suite {
    Suite {
        name: "band-booking",
        description: "Band lifecycle: publish, update, book, cancel, close",
        steps: vec![
            Step::new("Priest Login", common::priest_login),
            Step::new("Faithful Login", common::faithful_login),
            Step::new("Create Band", create_band),
            Step::new("Update Band", update_band),
            Step::new("Band Role Check", band_role_check),
            Step::new("List Available Bands", list_available_bands),
            Step::new("Book Band", book_band),
            Step::new("Cancel Band Booking", cancel_band_booking),
            Step::new("Close Band", close_band),
        ],
    }
}

fn create_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let body = json!({
            "startTime": to_iso(&tomorrow_at(18)),
            "endTime": to_iso(&tomorrow_at(19)),
            "location": "Confesionario Principal",
            "maxCapacity": 3,
            "notes": "Franja para reservas",
            "isRecurrent": false,
        });

        let res = expect_status(api.post("/confession-bands", &body, Some(&token)).await, 201)?;
        let id = require_str(&res, "id")?;

        ctx.band_id = Some(id.clone());
        Ok(format!("band created: {}", id))
    })
}

fn update_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let id = require(&ctx.band_id, "band id")?;
        let body = json!({
            "location": "Confesionario Lateral",
            "notes": "Horario actualizado",
        });

        let path = format!("/confession-bands/my-bands/{}", id);
        expect_status(api.patch(&path, &body, Some(&token)).await, 200)?;
        Ok(format!("band {} updated", id))
    })
}

/// Only priests may publish bands.
fn band_role_check<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let body = json!({
            "startTime": to_iso(&tomorrow_at(9)),
            "endTime": to_iso(&tomorrow_at(10)),
            "location": "Intento no autorizado",
            "maxCapacity": 2,
            "isRecurrent": false,
        });

        expect_status(api.post("/confession-bands", &body, Some(&token)).await, 403)?;
        Ok("faithful cannot publish bands".to_string())
    })
}

fn list_available_bands<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;

        let res = expect_status(
            api.get("/confession-bands/available", Some(&token)).await,
            200,
        )?;
        let bands = expect_array(&res)?;
        Ok(format!("{} bands available", bands.len()))
    })
}

fn book_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let band_id = require(&ctx.band_id, "band id")?;
        let body = json!({
            "bandId": band_id,
            "notes": "Reserva de prueba",
        });

        let res = expect_status(
            api.post("/confession-bands/book", &body, Some(&token)).await,
            201,
        )?;
        let id = require_str(&res, "id")?;

        ctx.booking_id = Some(id.clone());
        Ok(format!("booking created: {}", id))
    })
}

fn cancel_band_booking<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let booking_id = require(&ctx.booking_id, "booking id")?;

        let path = format!("/confession-bands/bookings/{}/cancel", booking_id);
        let res = expect_status(api.patch(&path, &json!({}), Some(&token)).await, 200)?;
        if !res.has_field("message") {
            return Err(StepOutcome::fail(format!(
                "no confirmation message: {}",
                res.detail()
            )));
        }
        Ok(format!("booking {} cancelled", booking_id))
    })
}

/// The priest takes the band out of circulation.
fn close_band<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let id = require(&ctx.band_id, "band id")?;

        let path = format!("/confession-bands/my-bands/{}/status", id);
        let body = json!({"status": "cancelled"});
        expect_status(api.patch(&path, &body, Some(&token)).await, 200)?;
        Ok(format!("band {} closed", id))
    })
}
