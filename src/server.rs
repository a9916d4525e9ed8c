use crate::data::SeatingRequest;
use crate::error::SeatingError;
use crate::report::AllocationReport;
use crate::solver;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info};

async fn allocate_handler(
    Json(input): Json<SeatingRequest>,
) -> Result<Json<AllocationReport>, (StatusCode, String)> {
    match solver::solve_concurrent(input).await {
        Ok(report) => Ok(Json(report)),
        Err(e @ SeatingError::InvalidConfiguration(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("Allocation failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub fn app() -> Router {
    Router::new().route("/v1/seating/allocate", post(allocate_handler))
}

pub async fn run_server(addr: &str) -> Result<(), SeatingError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/seating/allocate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn allocates_over_http() {
        let body = r#"{
            "buffer": 0,
            "mode": "Dense",
            "timetable": [{"date": "2025-10-31", "session": "Morning", "courses": ["CS101"]}],
            "rosters": {"CS101": ["r2", "r1"]},
            "names": {"r1": "Asha Rao"},
            "rooms": [{"number": "101", "building": "B1", "capacity": 30}]
        }"#;
        let response = app().oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let seats = &report["allocations"][0]["seats"];
        assert_eq!(seats[0]["roll"], "r1");
        assert_eq!(seats[0]["name"], "Asha Rao");
        assert_eq!(seats[1]["index"], 2);
        assert_eq!(report["vacancies"][0]["vacant"], 28);
    }

    #[tokio::test]
    async fn negative_buffer_is_a_bad_request() {
        let body = r#"{"buffer": -2, "mode": "Sparse", "timetable": [], "rosters": {}, "rooms": []}"#;
        let response = app().oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
