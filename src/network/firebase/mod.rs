//! Firebase platform: Authentication and Firestore via their REST APIs.

pub mod auth;
pub mod firestore;
mod values;

pub use auth::FirebaseAuth;
pub use firestore::FirestoreStore;

use serde::Deserialize;

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Best-effort message out of a failed Google API response.
async fn api_error(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ApiErrorBody>().await {
        Ok(body) => format!("{status}: {}", body.error.message),
        Err(_) => status.to_string(),
    }
}
