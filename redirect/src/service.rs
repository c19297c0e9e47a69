use crate::campaigns::Campaigns;
use crate::deeplink::{chat_link, share_link};
use crate::errors::RedirectError;
use crate::metrics_defs::{REDIRECTS, REQUEST_DURATION, UNKNOWN_SLUG, USAGE_RECORD_FAILED};
use crate::visitor::{self, Platform};
use http::header::{CACHE_CONTROL, LOCATION};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use rotation::store::UsageRecorder;
use rotation::{Selector, Visitor};
use shared::http::{PeerAddr, full_body, make_boxed_error_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub const PROVENANCE_HEADER: &str = "x-rotation-provenance";

type RedirectResponse = Response<BoxBody<Bytes, RedirectError>>;

/// Everything a redirect needs from the request, owned so the request can be
/// dropped before any storage call.
#[derive(Debug, PartialEq, Eq)]
struct Click {
    slug: String,
    ip: String,
    user_agent: String,
}

impl Click {
    fn from_request<B>(req: &Request<B>) -> Result<Self, StatusCode> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Err(StatusCode::METHOD_NOT_ALLOWED);
        }

        let slug = req.uri().path().trim_matches('/');
        if slug.is_empty() || slug.contains('/') {
            return Err(StatusCode::NOT_FOUND);
        }

        let headers = req.headers();
        let peer = req.extensions().get::<PeerAddr>().map(|p| p.0);

        Ok(Click {
            slug: slug.to_string(),
            ip: visitor::client_ip(headers, peer),
            user_agent: visitor::user_agent(headers).to_string(),
        })
    }
}

struct RedirectInner {
    campaigns: Arc<Campaigns>,
    selector: Arc<Selector>,
    usage: Arc<dyn UsageRecorder>,
}

/// Serves `GET /{slug}` with a redirect to the chat link of the phone picked
/// by the rotation engine.
#[derive(Clone)]
pub struct RedirectService {
    inner: Arc<RedirectInner>,
}

impl RedirectService {
    pub fn new(
        campaigns: Arc<Campaigns>,
        selector: Arc<Selector>,
        usage: Arc<dyn UsageRecorder>,
    ) -> Self {
        RedirectService {
            inner: Arc::new(RedirectInner {
                campaigns,
                selector,
                usage,
            }),
        }
    }

    pub async fn handle<B>(&self, req: &Request<B>) -> RedirectResponse {
        self.inner.respond(Click::from_request(req)).await
    }
}

impl RedirectInner {
    async fn respond(&self, click: Result<Click, StatusCode>) -> RedirectResponse {
        let start = Instant::now();

        let response = match click {
            Ok(click) => match self.redirect(click).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build redirect");
                    make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
            Err(status) => make_boxed_error_response(status),
        };

        histogram!(REQUEST_DURATION, "status" => response.status().as_str().to_owned())
            .record(start.elapsed().as_secs_f64());
        response
    }

    async fn redirect(&self, click: Click) -> Result<RedirectResponse, RedirectError> {
        let Some(campaign) = self.campaigns.get(&click.slug) else {
            counter!(UNKNOWN_SLUG).increment(1);
            return Ok(make_boxed_error_response(StatusCode::NOT_FOUND));
        };

        let is_bot = visitor::is_bot(&click.user_agent);
        let platform = Platform::detect(&click.user_agent);
        let visitor = Visitor {
            ip: &click.ip,
            user_agent: &click.user_agent,
            is_bot,
        };

        let selection = self.selector.select(&campaign, &visitor).await;
        if let Some(phone_id) = &selection.phone_id {
            self.record_usage(phone_id.clone());
        }

        let message = campaign.message.as_deref();
        let link = if is_bot {
            share_link(&selection.phone_number, message)?
        } else {
            chat_link(&selection.phone_number, message, platform)?
        };

        counter!(
            REDIRECTS,
            "platform" => platform.as_str(),
            "provenance" => selection.provenance.as_str()
        )
        .increment(1);

        let response = Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, link.as_str())
            .header(CACHE_CONTROL, "no-store")
            .header(PROVENANCE_HEADER, selection.provenance.as_str())
            .body(full_body(Bytes::new()))?;
        Ok(response)
    }

    // Accounting never delays the redirect.
    fn record_usage(&self, phone_id: String) {
        let usage = self.usage.clone();
        tokio::spawn(async move {
            if let Err(e) = usage.record_phone_usage(&phone_id).await {
                counter!(USAGE_RECORD_FAILED).increment(1);
                tracing::warn!(phone_id = %phone_id, error = %e, "failed to record phone usage");
            }
        });
    }
}

impl Service<Request<Incoming>> for RedirectService {
    type Response = RedirectResponse;
    type Error = RedirectError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inner = self.inner.clone();
        let click = Click::from_request(&req);
        Box::pin(async move { Ok(inner.respond(click).await) })
    }
}
