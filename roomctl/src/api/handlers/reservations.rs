use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    AppState,
    api::models::{
        reservations::{
            CalendarReservationResponse, DataResponse, ListReservationsQuery, ReservationIdQuery, ReservationRequest, ReservationResponse,
            StatusResponse,
        },
        users::CurrentUser,
    },
    db::models::reservations::{ReservationCreateDBRequest, ReservationUpdateDBRequest},
    errors::{Error, Result},
    types::ReservationId,
};

fn not_found(id: ReservationId) -> Error {
    Error::NotFound {
        resource: "Reservation".to_string(),
        id: id.to_string(),
    }
}

/// Book the room
#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = ReservationRequest,
    tag = "reservations",
    responses(
        (status = 200, description = "Reservation created", body = DataResponse<ReservationResponse>),
        (status = 400, description = "Invalid title or time range"),
        (status = 401, description = "No valid session"),
        (status = 409, description = "Overlaps an existing reservation"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn create_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    payload: std::result::Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Json<DataResponse<ReservationResponse>>> {
    let Json(request) = payload?;
    let (title, range) = request.validate()?;

    let created = state
        .storage
        .create_reservation(&ReservationCreateDBRequest {
            user_id: current_user.id,
            title,
            range,
        })
        .await?;

    Ok(Json(DataResponse::success(created.into())))
}

/// Change the title or time of one of your reservations
#[utoipa::path(
    put,
    path = "/api/reservations",
    request_body = ReservationRequest,
    params(ReservationIdQuery),
    tag = "reservations",
    responses(
        (status = 200, description = "Reservation updated", body = DataResponse<ReservationResponse>),
        (status = 400, description = "Missing id, or invalid title or time range"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "No such confirmed reservation of yours"),
        (status = 409, description = "Overlaps another reservation"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn update_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ReservationIdQuery>,
    payload: std::result::Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Json<DataResponse<ReservationResponse>>> {
    let id = query.id()?;
    let Json(request) = payload?;
    let (title, range) = request.validate()?;

    let updated = state
        .storage
        .update_reservation(current_user.id, id, &ReservationUpdateDBRequest { title, range })
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse::success(updated.into())))
}

/// Cancel one of your reservations, freeing its slot
#[utoipa::path(
    put,
    path = "/api/reservations/cancel",
    params(ReservationIdQuery),
    tag = "reservations",
    responses(
        (status = 200, description = "Reservation canceled", body = DataResponse<ReservationResponse>),
        (status = 400, description = "Missing or non-numeric id"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "No such reservation of yours"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ReservationIdQuery>,
) -> Result<Json<DataResponse<ReservationResponse>>> {
    let id = query.id()?;

    let canceled = state
        .storage
        .cancel_reservation(current_user.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse::success(canceled.into())))
}

/// Permanently remove one of your reservations
#[utoipa::path(
    delete,
    path = "/api/reservations",
    params(ReservationIdQuery),
    tag = "reservations",
    responses(
        (status = 200, description = "Reservation deleted", body = StatusResponse),
        (status = 400, description = "Missing or non-numeric id"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "No such reservation of yours"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn delete_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ReservationIdQuery>,
) -> Result<Json<StatusResponse>> {
    let id = query.id()?;

    if !state.storage.delete_reservation(current_user.id, id).await? {
        return Err(not_found(id));
    }
    Ok(Json(StatusResponse::success()))
}

/// Get a single reservation
#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    params(("id" = i64, Path, description = "Reservation ID")),
    tag = "reservations",
    responses(
        (status = 200, description = "The reservation", body = DataResponse<ReservationResponse>),
        (status = 401, description = "No valid session"),
        (status = 404, description = "Reservation not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_reservation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    path: std::result::Result<Path<ReservationId>, PathRejection>,
) -> Result<Json<DataResponse<ReservationResponse>>> {
    let Path(id) = path.map_err(|e| Error::BadRequest { message: e.body_text() })?;

    let reservation = state.storage.get_reservation(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse::success(reservation.into())))
}

/// Your confirmed reservations, earliest first
#[utoipa::path(
    get,
    path = "/api/reservations/me",
    tag = "reservations",
    responses(
        (status = 200, description = "Your reservations", body = DataResponse<Vec<ReservationResponse>>),
        (status = 401, description = "No valid session"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn list_my_reservations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<DataResponse<Vec<ReservationResponse>>>> {
    let reservations = state.storage.list_user_reservations(current_user.id).await?;

    Ok(Json(DataResponse::success(reservations.into_iter().map(Into::into).collect())))
}

/// Everyone's confirmed reservations in a day, date range, or month
#[utoipa::path(
    get,
    path = "/api/reservations",
    params(ListReservationsQuery),
    tag = "reservations",
    responses(
        (status = 200, description = "Reservations overlapping the window, earliest first", body = DataResponse<Vec<CalendarReservationResponse>>),
        (status = 400, description = "No window given, or a date that does not parse"),
        (status = 401, description = "No valid session"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_reservations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListReservationsQuery>,
) -> Result<Json<DataResponse<Vec<CalendarReservationResponse>>>> {
    let window = query.window()?;
    let range = window.range().map_err(|e| Error::BadRequest { message: e.to_string() })?;

    let rows = state.storage.list_reservations_in(&range).await?;

    Ok(Json(DataResponse::success(rows.into_iter().map(Into::into).collect())))
}

#[cfg(test)]
mod tests {
    use crate::{
        AppState,
        api::models::reservations::{ReservationResponse, ReservationStatus},
        test_utils::{FakeIdentityProvider, create_test_app, login_as},
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    struct Ctx {
        server: TestServer,
        state: AppState,
    }

    fn setup() -> Ctx {
        let (server, state) = create_test_app(FakeIdentityProvider::with_profile("g-1", "alice@example.org"));
        Ctx { server, state }
    }

    fn body(title: &str, start: &str, end: &str) -> Value {
        json!({ "title": title, "start_time": start, "end_time": end })
    }

    async fn create(ctx: &Ctx, cookie: &str, start: &str, end: &str) -> axum_test::TestResponse {
        ctx.server
            .post("/api/reservations")
            .add_header("cookie", cookie.to_string())
            .json(&body("Standup", start, end))
            .await
    }

    fn data(response: &axum_test::TestResponse) -> ReservationResponse {
        let value: Value = response.json();
        assert_eq!(value["status"], "success");
        serde_json::from_value(value["data"].clone()).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_every_endpoint_requires_session() {
        let ctx = setup();

        let responses = [
            ctx.server.post("/api/reservations").json(&body("x", "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z")).await,
            ctx.server.put("/api/reservations").add_query_param("id", 1).await,
            ctx.server.put("/api/reservations/cancel").add_query_param("id", 1).await,
            ctx.server.delete("/api/reservations").add_query_param("id", 1).await,
            ctx.server.get("/api/reservations/1").await,
            ctx.server.get("/api/reservations/me").await,
            ctx.server.get("/api/reservations").add_query_param("month", "2025-07").await,
        ];
        for response in responses {
            response.assert_status_unauthorized();
            assert_eq!(response.json::<Value>()["status"], "error");
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_overlap_is_rejected_and_touching_is_allowed() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;
        let (_, bob) = login_as(&ctx.state, "g-2", "bob@example.org").await;

        let first = create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await;
        first.assert_status_ok();
        let first = data(&first);
        assert_eq!(first.status, ReservationStatus::Confirmed);
        assert_eq!(first.title, "Standup");

        let clash = create(&ctx, &bob, "2025-07-01T10:30:00Z", "2025-07-01T11:30:00Z").await;
        clash.assert_status(StatusCode::CONFLICT);
        let clash: Value = clash.json();
        assert_eq!(clash["status"], "error");
        assert_eq!(clash["conflicting_id"], first.id);

        create(&ctx, &bob, "2025-07-01T11:00:00Z", "2025-07-01T12:00:00Z").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_input_is_bad_request() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;

        // Inverted and empty ranges
        create(&ctx, &alice, "2025-07-01T11:00:00Z", "2025-07-01T10:00:00Z").await.assert_status_bad_request();
        create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T10:00:00Z").await.assert_status_bad_request();

        // Blank and overlong titles
        for title in ["   ".to_string(), "x".repeat(201)] {
            ctx.server
                .post("/api/reservations")
                .add_header("cookie", alice.clone())
                .json(&body(&title, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z"))
                .await
                .assert_status_bad_request();
        }

        // Malformed JSON gets the JSON error shape
        let response = ctx
            .server
            .post("/api/reservations")
            .add_header("cookie", alice.clone())
            .json(&json!({ "title": "x", "start_time": "yesterday" }))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["status"], "error");

        // Missing and non-numeric ids
        let cancel = ctx.server.put("/api/reservations/cancel").add_header("cookie", alice.clone()).await;
        cancel.assert_status_bad_request();
        ctx.server
            .put("/api/reservations/cancel")
            .add_query_param("id", "abc")
            .add_header("cookie", alice.clone())
            .await
            .assert_status_bad_request();
        ctx.server
            .get("/api/reservations/abc")
            .add_header("cookie", alice.clone())
            .await
            .assert_status_bad_request();
    }

    #[test_log::test(tokio::test)]
    async fn test_update_excludes_itself_and_checks_others() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;

        let mine = data(&create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await);
        let other = data(&create(&ctx, &alice, "2025-07-01T12:00:00Z", "2025-07-01T13:00:00Z").await);

        // Stretching over its own old slot is fine
        let response = ctx
            .server
            .put("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", alice.clone())
            .json(&body("Planning", "2025-07-01T10:30:00Z", "2025-07-01T12:00:00Z"))
            .await;
        response.assert_status_ok();
        let updated = data(&response);
        assert_eq!(updated.id, mine.id);
        assert_eq!(updated.title, "Planning");

        // Reaching into the next reservation is not
        let response = ctx
            .server
            .put("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", alice.clone())
            .json(&body("Planning", "2025-07-01T10:30:00Z", "2025-07-01T12:30:00Z"))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["conflicting_id"], other.id);
    }

    #[test_log::test(tokio::test)]
    async fn test_other_users_reservations_are_not_found() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;
        let (_, bob) = login_as(&ctx.state, "g-2", "bob@example.org").await;

        let mine = data(&create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await);

        ctx.server
            .put("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", bob.clone())
            .json(&body("Hijack", "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z"))
            .await
            .assert_status_not_found();
        ctx.server
            .put("/api/reservations/cancel")
            .add_query_param("id", mine.id)
            .add_header("cookie", bob.clone())
            .await
            .assert_status_not_found();
        ctx.server
            .delete("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", bob.clone())
            .await
            .assert_status_not_found();

        // Still Alice's, untouched, and visible to anyone logged in
        let response = ctx.server.get(&format!("/api/reservations/{}", mine.id)).add_header("cookie", bob.clone()).await;
        response.assert_status_ok();
        assert_eq!(data(&response), mine);

        ctx.server
            .get("/api/reservations/9999")
            .add_header("cookie", bob)
            .await
            .assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_cancel_frees_slot_and_hides_from_listings() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;
        let (_, bob) = login_as(&ctx.state, "g-2", "bob@example.org").await;

        let mine = data(&create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await);

        for _ in 0..2 {
            let response = ctx
                .server
                .put("/api/reservations/cancel")
                .add_query_param("id", mine.id)
                .add_header("cookie", alice.clone())
                .await;
            response.assert_status_ok();
            assert_eq!(data(&response).status, ReservationStatus::Canceled);
        }

        // Canceled reservations can't be edited
        ctx.server
            .put("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", alice.clone())
            .json(&body("Back", "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z"))
            .await
            .assert_status_not_found();

        let mine_list: Value = ctx.server.get("/api/reservations/me").add_header("cookie", alice.clone()).await.json();
        assert_eq!(mine_list["data"], json!([]));
        let day: Value = ctx
            .server
            .get("/api/reservations")
            .add_query_param("date", "2025-07-01")
            .add_header("cookie", alice.clone())
            .await
            .json();
        assert_eq!(day["data"], json!([]));

        create(&ctx, &bob, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_removes_reservation() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;

        let mine = data(&create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await);

        let response = ctx
            .server
            .delete("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", alice.clone())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "status": "success" }));

        assert!(ctx.state.storage.get_reservation(mine.id).await.unwrap().is_none());
        ctx.server
            .delete("/api/reservations")
            .add_query_param("id", mine.id)
            .add_header("cookie", alice)
            .await
            .assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_my_reservations_are_ordered_and_scoped() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;
        let (_, bob) = login_as(&ctx.state, "g-2", "bob@example.org").await;

        let later = data(&create(&ctx, &alice, "2025-07-02T10:00:00Z", "2025-07-02T11:00:00Z").await);
        let earlier = data(&create(&ctx, &alice, "2025-07-01T10:00:00Z", "2025-07-01T11:00:00Z").await);
        create(&ctx, &bob, "2025-07-03T10:00:00Z", "2025-07-03T11:00:00Z").await.assert_status_ok();

        let response: Value = ctx.server.get("/api/reservations/me").add_header("cookie", alice).await.json();
        let ids: Vec<i64> = response["data"].as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![earlier.id, later.id]);
    }

    #[test_log::test(tokio::test)]
    async fn test_windowed_listings() {
        let ctx = setup();
        let (_, alice) = login_as(&ctx.state, "g-1", "alice@example.org").await;

        let straddling = data(&create(&ctx, &alice, "2025-07-31T23:00:00Z", "2025-08-01T00:30:00Z").await);
        let mid_july = data(&create(&ctx, &alice, "2025-07-15T09:00:00Z", "2025-07-15T10:00:00Z").await);

        let list = |params: Vec<(&'static str, &'static str)>| {
            let mut request = ctx.server.get("/api/reservations").add_header("cookie", alice.clone());
            for (k, v) in params {
                request = request.add_query_param(k, v);
            }
            request
        };
        let ids = |value: Value| -> Vec<i64> {
            value["data"].as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect()
        };

        let july: Value = list(vec![("month", "2025-07")]).await.json();
        assert_eq!(ids(july.clone()), vec![mid_july.id, straddling.id]);
        assert_eq!(july["data"][0]["user_name"], "Alice");

        let august: Value = list(vec![("month", "2025-08")]).await.json();
        assert_eq!(ids(august), vec![straddling.id]);

        let week: Value = list(vec![("start", "2025-07-14"), ("end", "2025-07-20")]).await.json();
        assert_eq!(ids(week), vec![mid_july.id]);

        let day: Value = list(vec![("date", "2025-08-01")]).await.json();
        assert_eq!(ids(day), vec![straddling.id]);

        // Month wins over date
        let both: Value = list(vec![("date", "2025-08-01"), ("month", "2025-07")]).await.json();
        assert_eq!(ids(both).len(), 2);

        // An empty month is ignored
        let blank_month: Value = list(vec![("month", ""), ("date", "2025-08-01")]).await.json();
        assert_eq!(ids(blank_month), vec![straddling.id]);

        list(vec![]).await.assert_status_bad_request();
        list(vec![("month", "2025-13")]).await.assert_status_bad_request();
        list(vec![("date", "July 1st")]).await.assert_status_bad_request();
        list(vec![("start", "2025-07-20"), ("end", "2025-07-14")]).await.assert_status_bad_request();
    }
}
