//! Handlers bound to live controller instances

use crate::core::request::RequestData;
use crate::core::response::HandlerResult;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Final stage of a dispatch entry
pub type Handler = Arc<dyn Fn(RequestData) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Bind a controller method to a controller instance
///
/// ```rust,ignore
/// fn bind(self: Arc<Self>, handler: &str) -> Option<Handler> {
///     match handler {
///         "login" => Some(handler::bind(self, Self::login)),
///         _ => None,
///     }
/// }
/// ```
pub fn bind<C, F, Fut>(controller: Arc<C>, method: F) -> Handler
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, RequestData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |request| Box::pin(method(controller.clone(), request)))
}

/// Wrap a free async function as a handler
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::response::HandlerResponse;
    use serde_json::json;

    struct Greeter {
        greeting: &'static str,
    }

    impl Greeter {
        async fn greet(self: Arc<Self>, request: RequestData) -> HandlerResult {
            let name = request.param("name").unwrap_or("stranger").to_string();
            Ok(HandlerResponse::ok(json!({ "message": format!("{} {}", self.greeting, name) })))
        }
    }

    #[tokio::test]
    async fn test_bound_method_sees_its_instance() {
        let handler = bind(Arc::new(Greeter { greeting: "Hello" }), Greeter::greet);
        let request = RequestData::default().with_params(json!({ "name": "Ada" }));

        let response = handler(request).await.unwrap();
        assert_eq!(response.body, Some(json!({ "message": "Hello Ada" })));
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|_req: RequestData| async move { Ok(HandlerResponse::no_content()) });
        let response = handler(RequestData::default()).await.unwrap();
        assert_eq!(response.status.as_u16(), 204);
    }
}
