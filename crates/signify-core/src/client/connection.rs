//! A controller's connection to its remote agent.
//!
//! Every state-changing operation holds the controller lock for its whole
//! round trip, so two rotations can never interleave. Events are staged
//! under a [`PendingGuard`]: if the request fails or the future is
//! dropped mid-flight, the staged event is abandoned and the key state is
//! exactly what it was before.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};

use crate::auth::{Authenticator, Headers, HEADER_CONTENT_TYPE, HEADER_RESOURCE, HEADER_SIG_TIME};
use crate::controller::{Agent, Controller, ControllerRecord, KeyStateRecord, ManagedIdentifier, PendingGuard};
use crate::crypto::keys::KeyPair;
use crate::crypto::signing;
use crate::error::{Result, SignifyError};
use crate::exchange::Exchange;
use crate::time;

use super::config::ClientConfig;
use super::transport::{HttpRequest, HttpResponse, Transport};

/// What the agent reports for a controller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub agent: Option<KeyStateRecord>,
    #[serde(default)]
    pub controller: Option<ControllerRecord>,
    #[serde(default)]
    pub ridx: u32,
    #[serde(default)]
    pub pidx: u32,
}

#[derive(Debug, Clone)]
struct Session {
    agent: Agent,
    authn: Authenticator,
    pidx: u32,
}

/// Connection between a local controller and its agent.
pub struct Connection {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    controller: Mutex<Controller>,
    pre: String,
    session: RwLock<Option<Session>>,
}

impl Connection {
    pub fn new(config: ClientConfig, controller: Controller, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            pre: controller.pre().to_owned(),
            controller: Mutex::new(controller),
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The controller's identifier.
    pub fn pre(&self) -> &str {
        &self.pre
    }

    /// Exclusive access to the controller.
    pub fn controller(&self) -> &Mutex<Controller> {
        &self.controller
    }

    /// The connected agent, if [`connect`](Self::connect) has succeeded.
    pub async fn agent(&self) -> Option<Agent> {
        self.session.read().await.as_ref().map(|s| s.agent.clone())
    }

    /// Next free index for identifiers the agent manages for us.
    pub async fn pidx(&self) -> Option<u32> {
        self.session.read().await.as_ref().map(|s| s.pidx)
    }

    /// Fetch the agent's view of this controller.
    pub async fn state(&self) -> Result<AgentState> {
        let path = format!("/agent/{}", self.pre);
        let resp = self
            .transport
            .send(HttpRequest::new("GET", self.config.endpoint(&path)))
            .await?;
        if resp.status == 404 {
            return Err(SignifyError::Remote {
                method: "GET".into(),
                path,
                status: Some(404),
                message: format!("agent does not exist for controller {}", self.pre),
            });
        }
        check_status("GET", &path, &resp)?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    /// Establish trust with the agent and start signing requests.
    ///
    /// The agent's delegated inception must name this controller as its
    /// delegator. A controller still at its inception approves the
    /// delegation with an anchoring interaction first.
    pub async fn connect(&self) -> Result<()> {
        let state = self.state().await?;
        let record = state.agent.as_ref().ok_or_else(|| {
            SignifyError::TrustEstablishment(format!("no agent state for controller {}", self.pre))
        })?;

        let mut ctrl = self.controller.lock().await;
        let agent = Agent::parse(ctrl.codec(), record)?;
        if let Some(remote) = &state.controller {
            ctrl.adopt(remote, state.ridx)?;
        }
        if agent.anchor != ctrl.pre() {
            return Err(SignifyError::TrustEstablishment(format!(
                "commitment to controller {} missing in agent {} inception",
                ctrl.pre(),
                agent.pre
            )));
        }

        if ctrl.state().sn == 0 {
            self.approve_delegation(&mut ctrl, &agent).await?;
        }

        let authn = Authenticator::new(ctrl.signer().clone(), agent.verfer.clone());
        log::debug!("connected controller {} to agent {}", ctrl.pre(), agent.pre);
        *self.session.write().await = Some(Session {
            agent,
            authn,
            pidx: state.pidx,
        });
        Ok(())
    }

    async fn approve_delegation(&self, ctrl: &mut Controller, agent: &Agent) -> Result<()> {
        let signed = ctrl.approve_delegation(agent)?;
        let guard = PendingGuard::new(ctrl);
        let path = format!("/agent/{}?type=ixn", self.pre);
        let body = json!({ "ixn": signed.serder, "sigs": signed.sigs });
        let request = HttpRequest::new("PUT", self.config.endpoint(&path)).with_json_body(&body)?;

        let resp = self.transport.send(request).await?;
        check_status("PUT", &path, &resp)?;
        guard.confirm()
    }

    /// Send a signed request to the agent and authenticate its response.
    pub async fn fetch(
        &self,
        path: &str,
        method: &str,
        body: Option<&Value>,
        extra_headers: Option<&Headers>,
    ) -> Result<HttpResponse> {
        let session = self.session.read().await.clone().ok_or_else(|| {
            SignifyError::Authentication("client must connect before sending signed requests".into())
        })?;
        let bare_path = strip_query(path);

        let mut headers = Headers::new();
        headers.set(HEADER_RESOURCE, self.pre.as_str());
        headers.set(HEADER_SIG_TIME, time::agent_timestamp());
        headers.set(HEADER_CONTENT_TYPE, "application/json");
        let mut headers = session.authn.sign(headers, method, bare_path)?;
        if let Some(extra) = extra_headers {
            headers.merge(extra);
        }

        let mut request = HttpRequest::new(method, self.config.endpoint(path)).with_headers(headers);
        if method != "GET" {
            if let Some(body) = body {
                request.body = Some(serde_json::to_vec(body)?);
            }
        }
        log::debug!("{method} {path}");
        let resp = self.transport.send(request).await?;
        check_status(method, path, &resp)?;

        if resp.headers.get(HEADER_RESOURCE) != Some(session.agent.pre.as_str()) {
            log::warn!("{method} {path}: response not from agent {}", session.agent.pre);
            return Err(SignifyError::Authentication(
                "message from a different remote agent".into(),
            ));
        }
        if !session.authn.verify(&resp.headers, method, bare_path) {
            return Err(SignifyError::Authentication(format!(
                "response verification failed for {method} {path}"
            )));
        }
        Ok(resp)
    }

    /// Rotate the controller to keys derived from `passcode`, re-sealing
    /// the key material of `managed` identifiers to the new key.
    ///
    /// The rotation only takes effect once the agent accepts it.
    pub async fn rotate(&self, passcode: &str, managed: &[ManagedIdentifier]) -> Result<HttpResponse> {
        let mut ctrl = self.controller.lock().await;
        let request = ctrl.rotate(passcode, managed)?;
        let guard = PendingGuard::new(&mut ctrl);

        let path = format!("/agent/{}", self.pre);
        let http = HttpRequest::new("PUT", self.config.endpoint(&path))
            .with_json_body(&serde_json::to_value(&request)?)?;
        let resp = self.transport.send(http).await?;
        if let Err(err) = check_status("PUT", &path, &resp) {
            log::warn!("agent rejected rotation {}", request.rot.said());
            return Err(err);
        }
        guard.confirm()?;

        let mut session = self.session.write().await;
        if let Some(session) = session.as_mut() {
            session.authn = Authenticator::new(ctrl.signer().clone(), session.agent.verfer.clone());
        }
        Ok(resp)
    }

    /// Sign an exchange with `signer` and send it through the agent.
    pub async fn send_exchange(
        &self,
        name: &str,
        topic: &str,
        exchange: &Exchange,
        signer: &KeyPair,
        recipients: &[String],
    ) -> Result<HttpResponse> {
        let sig = signing::sign_indexed(signer, exchange.exn.raw(), 0, false)?;
        self.send_from_events(name, topic, exchange, &[sig.qb64()?], recipients)
            .await
    }

    /// Send an already signed exchange through the agent.
    pub async fn send_from_events(
        &self,
        name: &str,
        topic: &str,
        exchange: &Exchange,
        sigs: &[String],
        recipients: &[String],
    ) -> Result<HttpResponse> {
        let body = json!({
            "tpc": topic,
            "exn": exchange.exn,
            "sigs": sigs,
            "atc": exchange.attachment_text(),
            "rec": recipients,
        });
        let path = format!("/identifiers/{name}/exchanges");
        self.fetch(&path, "POST", Some(&body), None).await
    }

    /// Sign a request to an external service as `prefix`.
    ///
    /// The signature covers the URL's path, not its host or query.
    pub fn create_signed_request(
        &self,
        signer: &KeyPair,
        prefix: &str,
        url: &str,
        method: &str,
        headers: Headers,
    ) -> Result<HttpRequest> {
        let mut headers = headers;
        headers.set(HEADER_RESOURCE, prefix);
        headers.set(HEADER_SIG_TIME, time::agent_timestamp());
        let authn = Authenticator::new(signer.clone(), signer.verfer().clone());
        let signed = authn.sign(headers, method, url_path(url))?;
        Ok(HttpRequest::new(method, url).with_headers(signed))
    }

    /// Ask the agent to keep the previous passcode during a rotation.
    pub async fn save_old_passcode(&self, passcode: &str) -> Result<HttpResponse> {
        let path = format!("/salt/{}", self.pre);
        let request = HttpRequest::new("PUT", self.config.endpoint(&path))
            .with_json_body(&json!({ "salt": passcode }))?;
        let resp = self.transport.send(request).await?;
        check_status("PUT", &path, &resp)?;
        Ok(resp)
    }

    /// Remove a saved passcode from the agent.
    pub async fn delete_passcode(&self) -> Result<HttpResponse> {
        let path = format!("/salt/{}", self.pre);
        let mut request = HttpRequest::new("DELETE", self.config.endpoint(&path));
        request.headers.set(HEADER_CONTENT_TYPE, "application/json");
        let resp = self.transport.send(request).await?;
        check_status("DELETE", &path, &resp)?;
        Ok(resp)
    }
}

fn check_status(method: &str, path: &str, resp: &HttpResponse) -> Result<()> {
    if resp.is_success() {
        return Ok(());
    }
    log::warn!("{method} {path} returned {}", resp.status);
    Err(SignifyError::Remote {
        method: method.to_owned(),
        path: path.to_owned(),
        status: Some(resp.status),
        message: resp.text(),
    })
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

/// Path component of an absolute URL, without its query.
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.find('/').map_or("/", |i| &rest[i..]);
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
