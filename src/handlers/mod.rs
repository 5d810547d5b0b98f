//! Handlers for the `user` operations of the document.
//!
//! Bodies reaching these handlers have already been validated against the
//! operation's body schema by the server, so decoding failures here are rare and
//! answered with 400.

mod store;

pub use store::{UpdateOutcome, UserRecord, UserStore};

use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Operation ids served by [`register_user_handlers`].
pub const USER_OPERATIONS: [&str; 8] = [
    "createUser",
    "createUsersWithArrayInput",
    "createUsersWithListInput",
    "loginUser",
    "logoutUser",
    "getUserByName",
    "updateUser",
    "deleteUser",
];

fn decode_body<T: DeserializeOwned>(req: &HandlerRequest) -> Result<T, HandlerResponse> {
    let body = req.body.clone().unwrap_or(Value::Null);
    serde_json::from_value(body).map_err(|e| {
        warn!(request_id = %req.request_id, handler_name = %req.handler_name, error = %e, "Undecodable body");
        HandlerResponse::error(400, &format!("Invalid body: {e}"))
    })
}

fn user_not_found() -> HandlerResponse {
    HandlerResponse::error(404, "User not found")
}

fn create_user(store: &UserStore, req: HandlerRequest) -> HandlerResponse {
    match decode_body::<UserRecord>(&req) {
        Ok(user) => {
            info!(request_id = %req.request_id, username = %user.username, "User created");
            store.upsert(user);
            HandlerResponse::empty(200)
        }
        Err(resp) => resp,
    }
}

fn create_users(store: &UserStore, req: HandlerRequest) -> HandlerResponse {
    match decode_body::<Vec<UserRecord>>(&req) {
        Ok(users) => {
            let count = store.upsert_all(users);
            info!(request_id = %req.request_id, count = count, "Users created");
            HandlerResponse::empty(200)
        }
        Err(resp) => resp,
    }
}

fn get_user_by_name(store: &UserStore, req: HandlerRequest) -> HandlerResponse {
    let Some(username) = req.get_path_param("username") else {
        return user_not_found();
    };
    match store.get(username).map(serde_json::to_value) {
        Some(Ok(body)) => HandlerResponse::json(200, body),
        Some(Err(e)) => HandlerResponse::error(500, &format!("Failed to encode user: {e}")),
        None => user_not_found(),
    }
}

fn update_user(store: &UserStore, req: HandlerRequest) -> HandlerResponse {
    let Some(username) = req.get_path_param("username") else {
        return user_not_found();
    };
    let user = match decode_body::<UserRecord>(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let new_name = user.username.clone();
    match store.update(username, user) {
        UpdateOutcome::Updated => HandlerResponse::empty(200),
        UpdateOutcome::NotFound => user_not_found(),
        UpdateOutcome::UsernameTaken => {
            warn!(request_id = %req.request_id, username = %username, new_username = %new_name, "Rename target already exists");
            HandlerResponse::error(409, "Username already taken")
        }
    }
}

fn delete_user(store: &UserStore, req: HandlerRequest) -> HandlerResponse {
    match req.get_path_param("username").and_then(|u| store.remove(u)) {
        Some(user) => {
            info!(request_id = %req.request_id, username = %user.username, "User deleted");
            HandlerResponse::empty(200)
        }
        None => user_not_found(),
    }
}

/// Register the eight user operations, all sharing `store`.
pub fn register_user_handlers(dispatcher: &mut Dispatcher, store: Arc<UserStore>) {
    let s = Arc::clone(&store);
    dispatcher.register_handler("createUser", move |req| create_user(&s, req));
    let s = Arc::clone(&store);
    dispatcher.register_handler("createUsersWithArrayInput", move |req| create_users(&s, req));
    let s = Arc::clone(&store);
    dispatcher.register_handler("createUsersWithListInput", move |req| create_users(&s, req));
    dispatcher.register_handler("loginUser", |_req| HandlerResponse::empty(200));
    dispatcher.register_handler("logoutUser", |_req| HandlerResponse::empty(200));
    let s = Arc::clone(&store);
    dispatcher.register_handler("getUserByName", move |req| get_user_by_name(&s, req));
    let s = Arc::clone(&store);
    dispatcher.register_handler("updateUser", move |req| update_user(&s, req));
    dispatcher.register_handler("deleteUser", move |req| delete_user(&store, req));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{HeaderVec, RequestId};
    use crate::router::ParamVec;
    use http::Method;
    use serde_json::json;

    fn request(handler: &str, username: Option<&str>, body: Option<Value>) -> HandlerRequest {
        let mut path_params = ParamVec::new();
        if let Some(u) = username {
            path_params.push((Arc::from("username"), u.to_string()));
        }
        HandlerRequest {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/user/{username}".to_string(),
            handler_name: handler.to_string(),
            path_params,
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body,
        }
    }

    #[test]
    fn test_get_user_by_name() {
        let store = UserStore::seeded();
        let resp = get_user_by_name(&store, request("getUserByName", Some("user1"), None));
        assert_eq!(resp.status, 200);
        let body = resp.body.unwrap();
        assert_eq!(body["username"], "user1");
        assert_eq!(body["id"], 123);

        let missing = get_user_by_name(&store, request("getUserByName", Some("nobody"), None));
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body, Some(json!({"error": "User not found"})));
    }

    #[test]
    fn test_create_then_delete() {
        let store = UserStore::new();
        let resp = create_user(
            &store,
            request("createUser", None, Some(json!({"id": 5, "username": "five"}))),
        );
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_none());
        assert!(store.get("five").is_some());

        assert_eq!(delete_user(&store, request("deleteUser", Some("five"), None)).status, 200);
        assert_eq!(delete_user(&store, request("deleteUser", Some("five"), None)).status, 404);
    }

    #[test]
    fn test_create_many_and_bad_body() {
        let store = UserStore::new();
        let body = json!([{"id": 1, "username": "a"}, {"id": 2, "username": "b"}]);
        assert_eq!(create_users(&store, request("createUsersWithArrayInput", None, Some(body))).status, 200);
        assert_eq!(store.len(), 2);

        let bad = create_user(&store, request("createUser", None, Some(json!({"username": "x"}))));
        assert_eq!(bad.status, 400);
    }

    #[test]
    fn test_update_unknown_user() {
        let store = UserStore::seeded();
        let body = json!({"id": 9, "username": "ghost"});
        let resp = update_user(&store, request("updateUser", Some("ghost"), Some(body)));
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_update_user_keeps_other_records() {
        let store = UserStore::seeded();
        store.upsert(UserRecord::new(2, "user2"));

        let body = json!({"id": 2, "username": "user2", "email": "two@example.com"});
        let resp = update_user(&store, request("updateUser", Some("user2"), Some(body)));
        assert_eq!(resp.status, 200);
        assert_eq!(store.get("user2").and_then(|u| u.email), Some("two@example.com".to_string()));

        let clash = json!({"id": 2, "username": "user1"});
        let resp = update_user(&store, request("updateUser", Some("user2"), Some(clash)));
        assert_eq!(resp.status, 409);
        assert_eq!(resp.body, Some(json!({"error": "Username already taken"})));
        assert_eq!(store.get("user1").map(|u| u.id), Some(123));
    }

    #[test]
    fn test_registers_every_operation() {
        let mut d = Dispatcher::new();
        register_user_handlers(&mut d, Arc::new(UserStore::seeded()));
        for op in USER_OPERATIONS {
            assert!(d.has_handler(op), "{op} not registered");
        }
    }
}
