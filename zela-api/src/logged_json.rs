//! JSON request guard that logs the bodies of API writes.
//!
//! Drop-in replacement for `Json<T>`: parses with Rocket's JSON guard,
//! then logs the re-serialized payload alongside method and path.

use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{
    Data, Request,
    data::{self, FromData},
};

pub struct LoggedJson<T>(pub T);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T: Deserialize<'r> + Serialize> FromData<'r> for LoggedJson<T> {
    type Error = rocket::serde::json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        match Json::<T>::from_data(req, data).await {
            data::Outcome::Success(json_data) => {
                match serde_json::to_string(&json_data.0) {
                    Ok(json_string) => {
                        info!(
                            "API Request Body: {} {} | Data: {}",
                            req.method().as_str(),
                            req.uri().path(),
                            json_string
                        );
                    }
                    Err(_) => {
                        info!(
                            "API Request Body: {} {} | Data: <failed to serialize>",
                            req.method().as_str(),
                            req.uri().path()
                        );
                    }
                }
                data::Outcome::Success(LoggedJson(json_data.into_inner()))
            }
            data::Outcome::Error(e) => data::Outcome::Error(e),
            data::Outcome::Forward(f) => data::Outcome::Forward(f),
        }
    }
}
