//! Directory endpoints: the public diocese and parish catalogs plus the
//! role-gated user listings.

use super::{expect_array, expect_status, require, Step, StepFuture, Suite};
use crate::client::ApiClient;
use crate::runner::context::RunContext;
use crate::suites::common;

pub fn suite() -> Suite {
    Suite {
        name: "directory",
        description: "Diocese, parish and user directory endpoints",
        steps: vec![
            Step::new("List Dioceses", list_dioceses),
            Step::new("List Parishes", list_parishes),
            Step::new("Bishop Login", common::bishop_login),
            Step::new("List Users", list_users),
            Step::new("Faithful Login", common::faithful_login),
            Step::new("List Priests", list_priests),
        ],
    }
}

fn list_dioceses<'a>(api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let res = expect_status(api.get("/dioceses", None).await, 200)?;
        let dioceses = expect_array(&res)?;
        Ok(format!("{} dioceses listed", dioceses.len()))
    })
}

fn list_parishes<'a>(api: &'a ApiClient, _ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let res = expect_status(api.get("/parishes", None).await, 200)?;
        let parishes = expect_array(&res)?;
        Ok(format!("{} parishes listed", parishes.len()))
    })
}

fn list_users<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.bishop_token, "bishop token")?;

        let res = expect_status(api.get("/users", Some(&token)).await, 200)?;
        let users = expect_array(&res)?;
        Ok(format!("{} users listed", users.len()))
    })
}

/// The priest directory faithful users browse when booking.
fn list_priests<'a>(api: &'a ApiClient, ctx: &'a mut RunContext) -> StepFuture<'a> {
    Box::pin(async move {
        let token = require(&ctx.faithful_token, "faithful token")?;

        let res = expect_status(api.get("/users/priests", Some(&token)).await, 200)?;
        let priests = expect_array(&res)?;
        Ok(format!("{} priests listed", priests.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::canned::CannedTransport;
    use crate::suites::{outcome_of, StepOutcome};
    use crate::utils::config::HarnessConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn context() -> RunContext {
        RunContext::new(HarnessConfig::default())
    }

    #[tokio::test]
    async fn public_catalogs_need_no_token() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!([{"id": "d-1", "name": "Diócesis de Madrid"}]));
        transport.push(200, json!([]));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();

        let outcome = outcome_of(list_dioceses(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);

        let outcome = outcome_of(list_parishes(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);

        assert_eq!(
            transport.requests(),
            vec![
                ("GET".to_string(), "/dioceses".to_string()),
                ("GET".to_string(), "/parishes".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn non_array_catalog_fails() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!({"error": "not a list"}));
        let api = ApiClient::with_transport(transport);
        let mut ctx = context();

        let outcome = outcome_of(list_dioceses(&api, &mut ctx).await);
        match outcome {
            StepOutcome::Failed { detail } => assert!(detail.contains("array")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn user_listing_requires_the_bishop_session() {
        let transport = Arc::new(CannedTransport::new());
        transport.push(200, json!([{"id": "u-1"}, {"id": "u-2"}]));
        let api = ApiClient::with_transport(transport.clone());
        let mut ctx = context();

        let outcome = outcome_of(list_users(&api, &mut ctx).await);
        assert_eq!(
            outcome,
            StepOutcome::fail("missing precondition: bishop token")
        );
        assert_eq!(transport.request_count(), 0);

        ctx.bishop_token = Some("jwt-bishop".to_string());
        let outcome = outcome_of(list_users(&api, &mut ctx).await);
        assert!(outcome.passed(), "unexpected outcome: {:?}", outcome);
    }
}
