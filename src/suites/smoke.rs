//! End-to-end walk over the core API: health, authentication, priest
//! onboarding, slots, bookings and the role guards between them.

use serde_json::json;

use super::{
    expect_array, expect_body_status, expect_status, require, require_str, unique_email, Step,
    StepFuture, StepOutcome, Suite,
};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::{common, registration};
use crate::utils::time::{days_from_now_at, to_iso, tomorrow_at};

pub fn suite() -> Suite {
    Suite {
        name: "smoke",
        description: "Core API walk: auth, onboarding, slots and confessions",
        steps: vec![
            Step::new("Health Check", health_check),
            Step::new("Bishop Login", common::bishop_login),
            Step::new("Create Invitation", registration::create_invitation),
            Step::new("Validate Invite Token", registration::validate_invite_token),
            Step::new("Register From Invitation", registration::register_from_invitation),
            Step::new("Direct Priest Application", registration::direct_priest_application),
            Step::new("Approve Priest", registration::approve_priest),
            Step::new("Reject Priest Application", registration::reject_priest_application),
            Step::new("Email Uniqueness", registration::email_uniqueness),
            Step::new("Priest Registration", priest_registration),
            Step::new("Faithful Registration", faithful_registration),
            Step::new("Priest Login", priest_login),
            Step::new("Faithful Login", faithful_login),
            Step::new("Create Confession Slot", create_confession_slot),
            Step::new("List Available Slots", common::list_available_slots),
            Step::new("List My Slots", list_my_slots),
            Step::new("Book Confession", book_confession),
            Step::new("List Faithful Confessions", list_faithful_confessions),
            Step::new("Complete Confession", complete_confession),
            Step::new("Role Based Access", role_based_access),
            Step::new("Cancel Confession", cancel_confession),
        ],
    }
}

fn health_check<'a>(api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let res = expect_status(api.get("/health", None).await, 200)?;
        if res.str_field("status") != Some("ok") {
            return Err(StepOutcome::fail(format!(
                "unexpected health payload: {}",
                res.detail()
            )));
        }
        Ok("status ok".to_string())
    })
}

/// Self-service priest registration issues a session right away.
fn priest_registration<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let email = unique_email("padre.miguel", "parroquia.com");
        let password = "MigracionDivina123";
        let body = json!({
            "email": email,
            "password": password,
            "firstName": "Miguel",
            "lastName": "Rodríguez",
            "role": "priest",
            "phone": "+34666777888",
        });

        let res = expect_status(api.post("/auth/register", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;

        ctx.priest_token = Some(token);
        ctx.registered_priest = Some((email.clone(), password.to_string()));
        Ok(format!("registered {}", email))
    })
}

fn faithful_registration<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let email = unique_email("maria.gonzalez", "gmail.com");
        let password = "AveMaria123";
        let body = json!({
            "email": email,
            "password": password,
            "firstName": "María",
            "lastName": "González",
            "role": "faithful",
            "phone": "+34666999000",
        });

        let res = expect_status(api.post("/auth/register", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;

        ctx.faithful_token = Some(token);
        ctx.registered_faithful = Some((email.clone(), password.to_string()));
        Ok(format!("registered {}", email))
    })
}

/// The credentials issued two steps ago must open a fresh session.
fn priest_login<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let (email, password) = require(&ctx.registered_priest, "registered priest credentials")?;
        let body = json!({"email": email, "password": password});

        let res = expect_status(api.post("/auth/login", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;

        ctx.priest_token = Some(token);
        Ok(format!("logged in as {}", email))
    })
}

fn faithful_login<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let (email, password) =
            require(&ctx.registered_faithful, "registered faithful credentials")?;
        let body = json!({"email": email, "password": password});

        let res = expect_status(api.post("/auth/login", &body, None).await, 201)?;
        let token = require_str(&res, "access_token")?;

        ctx.faithful_token = Some(token);
        Ok(format!("logged in as {}", email))
    })
}

fn create_confession_slot<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let body = json!({
            "startTime": to_iso(&tomorrow_at(16)),
            "endTime": to_iso(&tomorrow_at(17)),
            "location": "Confesionario Principal - Iglesia San Miguel",
            "notes": "Confesiones en español e inglés",
            "maxBookings": 1,
        });

        let res = expect_status(api.post("/confession-slots", &body, Some(&token)).await, 201)?;
        let id = require_str(&res, "id")?;

        ctx.slot_id = Some(id.clone());
        Ok(format!("slot created: {}", id))
    })
}

fn list_my_slots<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;

        let res = expect_status(
            api.get("/confession-slots/my-slots", Some(&token)).await,
            200,
        )?;
        let slots = expect_array(&res)?;
        Ok(format!("{} slots owned", slots.len()))
    })
}

fn book_confession<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;
        let slot_id = require(&ctx.slot_id, "confession slot id")?;
        let body = json!({
            "confessionSlotId": slot_id,
            "notes": "Primera confesión en mucho tiempo",
            "preparationNotes": "He estado preparándome con oración",
        });

        let res = expect_status(api.post("/confessions", &body, Some(&token)).await, 201)?;
        let id = require_str(&res, "id")?;

        ctx.confession_id = Some(id.clone());
        Ok(format!("confession booked: {}", id))
    })
}

fn list_faithful_confessions<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;

        let res = expect_status(api.get("/confessions", Some(&token)).await, 200)?;
        let confessions = expect_array(&res)?;
        Ok(format!("{} confessions listed", confessions.len()))
    })
}

fn complete_confession<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.priest_token, "priest token")?;
        let id = require(&ctx.confession_id, "confession id")?;

        let path = format!("/confessions/{}/complete", id);
        let res = expect_status(api.patch(&path, &json!({}), Some(&token)).await, 200)?;
        expect_body_status(&res, "completed")?;
        Ok(format!("confession {} completed", id))
    })
}

/// A faithful session must not be able to open confession slots.
fn role_based_access<'a>(api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let body = json!({
            "email": unique_email("role.test", "test.com"),
            "password": "RoleTest123",
            "firstName": "Role",
            "lastName": "Test",
            "role": "faithful",
        });
        let res = expect_status(api.post("/auth/register", &body, None).await, 201)?;
        let probe_token = require_str(&res, "access_token")?;

        let slot = json!({
            "startTime": to_iso(&tomorrow_at(19)),
            "endTime": to_iso(&tomorrow_at(20)),
            "location": "Role Test Location",
        });
        expect_status(
            api.post("/confession-slots", &slot, Some(&probe_token)).await,
            403,
        )?;
        Ok("faithful cannot create slots".to_string())
    })
}

/// Book a fresh slot and cancel it; the status must actually flip.
fn cancel_confession<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let priest_token = require(&ctx.priest_token, "priest token")?;
        let faithful_token = require(&ctx.faithful_token, "faithful token")?;

        let slot = json!({
            "startTime": to_iso(&days_from_now_at(2, 17)),
            "endTime": to_iso(&days_from_now_at(2, 18)),
            "location": "Confesionario Secundario",
            "maxBookings": 1,
        });
        let res = expect_status(
            api.post("/confession-slots", &slot, Some(&priest_token)).await,
            201,
        )?;
        let slot_id = require_str(&res, "id")?;

        let booking = json!({
            "confessionSlotId": slot_id,
            "notes": "Test booking for cancellation",
        });
        let res = expect_status(
            api.post("/confessions", &booking, Some(&faithful_token)).await,
            201,
        )?;
        let confession_id = require_str(&res, "id")?;

        let path = format!("/confessions/{}/cancel", confession_id);
        let res = expect_status(
            api.patch(&path, &json!({}), Some(&faithful_token)).await,
            200,
        )?;
        expect_body_status(&res, "cancelled")?;
        Ok(format!("confession {} cancelled", confession_id))
    })
}
