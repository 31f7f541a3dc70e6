//! Integration test: full controller/agent workflow.
//!
//! Drives a [`Connection`] against an in-memory agent that checks every
//! event and signature it receives and signs its own responses:
//! 1. Read the agent state
//! 2. Connect, approving the agent's delegated inception
//! 3. Send signed requests and authenticate the responses
//! 4. Rotate the controller and keep talking with the new key
//! 5. Send exchange messages and sign external requests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use signify_core::auth::{
    Authenticator, Headers, HEADER_CONTENT_TYPE, HEADER_RESOURCE, HEADER_SIG_TIME,
};
use signify_core::cesr::{mtr, Codec, IndexedSignature, Matter};
use signify_core::client::{transport_error, HttpRequest, HttpResponse, Transport};
use signify_core::controller::{KeyState, KeyStateRecord, ManagedIdentifier};
use signify_core::crypto::{sealing, signing, Digester, KeyPair, Salter, Tier};
use signify_core::event::{incept, Event, Serder, Threshold};
use signify_core::exchange::ExchangeBuilder;
use signify_core::time::agent_timestamp;
use signify_core::{ClientConfig, Connection, Controller, Result, SignifyError};

const URL: &str = "http://agent.test";
const BRAN: &str = "0123456789abcdefghijk";
const NBRAN: &str = "abcdefghijk0123456789";

// ── Mock agent ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Behaviour {
    reject_delegation: bool,
    reject_rotation: bool,
    drop_rotation: bool,
    foreign_resource: bool,
    forge_responses: bool,
}

struct AgentSim {
    keys: KeyPair,
    dip: Serder,
    ctrl: KeyState,
    ctrl_event: Value,
    approvals: usize,
    ridx: u32,
    rotations: Vec<Value>,
    signed: Vec<(String, String, Value)>,
    unsigned: Vec<(String, String, Value)>,
    behaviour: Behaviour,
}

/// An agent delegated from the controller it serves.
struct MockAgent {
    codec: Codec,
    sim: Mutex<AgentSim>,
}

impl MockAgent {
    fn new(ctrl: &Controller) -> Arc<Self> {
        Self::delegated_from(ctrl, ctrl.pre())
    }

    fn delegated_from(ctrl: &Controller, delegator: &str) -> Arc<Self> {
        let codec = Codec::standard();
        let keys = KeyPair::from_seed(&codec, &[7u8; 32], Tier::Low, true).unwrap();
        let digester = Digester::default();
        let next = digester.digest(b"agent next key", mtr::BLAKE3_256).unwrap();
        let dip = incept(
            &digester,
            vec![keys.verfer().qb64()],
            vec![next.qb64()],
            Some(delegator.to_owned()),
        )
        .unwrap();
        Arc::new(Self {
            codec,
            sim: Mutex::new(AgentSim {
                keys,
                dip,
                ctrl: ctrl.state().clone(),
                ctrl_event: ctrl.serder().to_value().unwrap(),
                approvals: 0,
                ridx: 0,
                rotations: Vec::new(),
                signed: Vec::new(),
                unsigned: Vec::new(),
                behaviour: Behaviour::default(),
            }),
        })
    }

    fn with<R>(&self, f: impl FnOnce(&mut AgentSim) -> R) -> R {
        f(&mut self.sim.lock().unwrap())
    }

    fn pre(&self) -> String {
        self.with(|sim| sim.dip.prefix().to_owned())
    }

    fn agent_record(sim: &AgentSim) -> KeyStateRecord {
        let dip = sim.dip.event();
        KeyStateRecord {
            vn: vec![1, 0],
            i: dip.prefix().to_owned(),
            s: "0".into(),
            p: String::new(),
            d: dip.said().to_owned(),
            f: "0".into(),
            dt: agent_timestamp(),
            et: "dip".into(),
            kt: Threshold::simple(1),
            k: dip.keys().unwrap().to_vec(),
            nt: Threshold::simple(1),
            n: dip.next_digests().unwrap().to_vec(),
            bt: "0".into(),
            b: vec![],
            c: vec![],
            ee: Value::Null,
            di: dip.delegator().map(str::to_owned),
        }
    }

    fn controller_record(sim: &AgentSim) -> KeyStateRecord {
        let state = &sim.ctrl;
        KeyStateRecord {
            vn: vec![1, 0],
            i: state.prefix.clone(),
            s: format!("{:x}", state.sn),
            p: String::new(),
            d: state.said.clone(),
            f: format!("{:x}", state.sn),
            dt: agent_timestamp(),
            et: sim.ctrl_event["t"].as_str().unwrap_or_default().to_owned(),
            kt: state.signing_threshold.clone(),
            k: state.keys.clone(),
            nt: state.next_threshold.clone(),
            n: state.next_digests.clone(),
            bt: "0".into(),
            b: vec![],
            c: vec![],
            ee: Value::Null,
            di: None,
        }
    }

    fn handle(&self, request: HttpRequest) -> Result<HttpResponse> {
        let path = request.url.strip_prefix(URL).unwrap_or(&request.url).to_owned();
        let body: Value = match &request.body {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => Value::Null,
        };
        let mut sim = self.sim.lock().unwrap();
        let ctrl_pre = sim.ctrl.prefix.clone();
        let method = request.method.as_str();

        if path == format!("/agent/{ctrl_pre}") && method == "GET" {
            let state = json!({
                "agent": Self::agent_record(&sim),
                "controller": { "state": Self::controller_record(&sim), "ee": sim.ctrl_event },
                "ridx": sim.ridx,
                "pidx": 3,
            });
            return Ok(plain(200, state));
        }
        if path.starts_with("/agent/") && method == "GET" {
            return Ok(plain(404, json!({"title": "unknown controller"})));
        }
        if path == format!("/agent/{ctrl_pre}?type=ixn") {
            if sim.behaviour.reject_delegation {
                return Ok(plain(400, json!({"title": "delegation refused"})));
            }
            return Ok(match self.accept_interaction(&mut sim, &body) {
                Ok(()) => {
                    sim.approvals += 1;
                    plain(204, Value::Null)
                }
                Err(e) => plain(400, json!({ "title": e.to_string() })),
            });
        }
        if path == format!("/agent/{ctrl_pre}") && method == "PUT" {
            if sim.behaviour.drop_rotation {
                return Err(transport_error(&request, "connection reset by peer"));
            }
            if sim.behaviour.reject_rotation {
                return Ok(plain(401, json!({"title": "rotation refused"})));
            }
            return Ok(match self.accept_rotation(&mut sim, &body) {
                Ok(()) => {
                    sim.rotations.push(body);
                    plain(204, Value::Null)
                }
                Err(e) => plain(400, json!({ "title": e.to_string() })),
            });
        }
        if path.starts_with("/salt/") {
            sim.unsigned.push((method.to_owned(), path, body));
            return Ok(plain(204, Value::Null));
        }

        // everything else must be signed by the controller's current key
        let bare = path.split('?').next().unwrap_or(&path).to_owned();
        let authentic = sim.ctrl.keys.iter().any(|key| {
            let verfer = self.codec.decode(key).unwrap();
            Authenticator::new(sim.keys.clone(), verfer).verify(&request.headers, method, &bare)
        });
        if !authentic {
            return Ok(plain(401, json!({"title": "request signature invalid"})));
        }
        sim.signed.push((method.to_owned(), path.clone(), body));

        let resource = if sim.behaviour.foreign_resource {
            "EForeignAgentPrefix".to_owned()
        } else {
            sim.dip.prefix().to_owned()
        };
        let signer = if sim.behaviour.forge_responses {
            KeyPair::from_seed(&self.codec, &[9u8; 32], Tier::Low, true)?
        } else {
            sim.keys.clone()
        };
        let mut headers = Headers::new();
        headers.set(HEADER_RESOURCE, resource);
        headers.set(HEADER_SIG_TIME, agent_timestamp());
        headers.set(HEADER_CONTENT_TYPE, "application/json");
        let verfer = signer.verfer().clone();
        let headers = Authenticator::new(signer, verfer).sign(headers, method, &bare)?;
        Ok(HttpResponse {
            status: 200,
            headers,
            body: serde_json::to_vec(&json!({ "path": path }))?,
        })
    }

    fn accept_interaction(&self, sim: &mut AgentSim, body: &Value) -> Result<()> {
        let serder = Serder::from_event(Event::from_value(body["ixn"].clone())?)?;
        serder.verify_said(&Digester::default())?;
        let next = sim.ctrl.apply(&serder)?;
        let sig = IndexedSignature::from_qb64(body["sigs"][0].as_str().unwrap_or_default())?;
        let key = self.key(&sim.ctrl.keys[sig.index() as usize])?;
        if !signing::verify_indexed(&key, serder.raw(), &sig) {
            return Err(SignifyError::Authentication("bad ixn signature".into()));
        }
        if !serder.text().contains(sim.dip.said()) {
            return Err(SignifyError::TrustEstablishment("ixn does not anchor the agent".into()));
        }
        sim.ctrl = next;
        sim.ctrl_event = serder.to_value()?;
        Ok(())
    }

    fn accept_rotation(&self, sim: &mut AgentSim, body: &Value) -> Result<()> {
        let serder = Serder::from_event(Event::from_value(body["rot"].clone())?)?;
        serder.verify_said(&Digester::default())?;
        let next = sim.ctrl.apply(&serder)?;

        // the prior commitment must be honoured by the first key
        let exposed = &next.keys[0];
        let digest = Digester::default().digest(exposed.as_bytes(), mtr::BLAKE3_256)?;
        if !sim.ctrl.next_digests.contains(&digest.qb64()) {
            return Err(SignifyError::Sequence("rotation breaks the key commitment".into()));
        }
        for sig in body["sigs"].as_array().into_iter().flatten() {
            let sig = IndexedSignature::from_qb64(sig.as_str().unwrap_or_default())?;
            let key = self.key(&next.keys[sig.index() as usize])?;
            if !signing::verify_indexed(&key, serder.raw(), &sig) {
                return Err(SignifyError::Authentication("bad rot signature".into()));
            }
        }
        sim.ctrl = next;
        sim.ctrl_event = serder.to_value()?;
        Ok(())
    }

    fn key(&self, qb64: &str) -> Result<Matter> {
        self.codec.decode(qb64)
    }
}

#[async_trait]
impl Transport for MockAgent {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.handle(request)
    }
}

fn plain(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: Headers::new(),
        body: if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&body).unwrap()
        },
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn controller(passcode: &str) -> Controller {
    let codec = Codec::standard();
    let salter = Salter::from_passcode(&codec, passcode, Tier::Low)
        .unwrap()
        .temporary();
    Controller::from_salter(&codec, salter, 0).unwrap()
}

fn connection(ctrl: Controller, agent: &Arc<MockAgent>) -> Connection {
    let transport: Arc<dyn Transport> = agent.clone();
    Connection::new(ClientConfig::new(URL, Tier::Low), ctrl, transport)
}

async fn connected() -> (Connection, Arc<MockAgent>) {
    let ctrl = controller(BRAN);
    let agent = MockAgent::new(&ctrl);
    let conn = connection(ctrl, &agent);
    conn.connect().await.expect("connect should succeed");
    (conn, agent)
}

// ── Connecting ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn state_reports_agent_and_controller() {
    let ctrl = controller(BRAN);
    let agent = MockAgent::new(&ctrl);
    let conn = connection(ctrl, &agent);

    let state = conn.state().await.unwrap();
    let record = state.agent.expect("agent record");
    assert_eq!(record.i, agent.pre());
    assert_eq!(record.di.as_deref(), Some(conn.pre()));
    assert_eq!(state.controller.unwrap().state.s, "0");
    assert_eq!(state.pidx, 3);
}

#[tokio::test]
async fn state_for_unknown_controller_is_not_found() {
    let ctrl = controller(BRAN);
    let agent = MockAgent::new(&controller(NBRAN));
    let conn = connection(ctrl, &agent);

    match conn.state().await {
        Err(SignifyError::Remote { status, .. }) => assert_eq!(status, Some(404)),
        other => panic!("expected a 404, got {other:?}"),
    }
}

#[tokio::test]
async fn connect_approves_delegation() {
    let (conn, agent) = connected().await;

    assert_eq!(agent.with(|sim| sim.approvals), 1);
    let ctrl = conn.controller().lock().await;
    assert_eq!(ctrl.state().sn, 1);
    assert!(!ctrl.has_pending());
    assert_eq!(agent.with(|sim| sim.ctrl.said.clone()), ctrl.state().said);
    drop(ctrl);

    assert_eq!(conn.agent().await.unwrap().pre, agent.pre());
    assert_eq!(conn.pidx().await, Some(3));
}

#[tokio::test]
async fn connect_rejects_agent_of_another_controller() {
    let ctrl = controller(BRAN);
    let agent = MockAgent::delegated_from(&ctrl, "EUnrelatedControllerPrefixAAAAAAAAAAAAAAAAA");
    let conn = connection(ctrl, &agent);

    let result = conn.connect().await;
    assert!(matches!(result, Err(SignifyError::TrustEstablishment(_))));
    assert_eq!(agent.with(|sim| sim.approvals), 0);
    assert_eq!(conn.controller().lock().await.state().sn, 0);
    assert!(conn.agent().await.is_none());
}

#[tokio::test]
async fn refused_delegation_leaves_controller_at_inception() {
    let ctrl = controller(BRAN);
    let agent = MockAgent::new(&ctrl);
    agent.with(|sim| sim.behaviour.reject_delegation = true);
    let conn = connection(ctrl, &agent);

    match conn.connect().await {
        Err(SignifyError::Remote { status, .. }) => assert_eq!(status, Some(400)),
        other => panic!("expected a rejected delegation, got {other:?}"),
    }
    let ctrl = conn.controller().lock().await;
    assert_eq!(ctrl.state().sn, 0);
    assert!(!ctrl.has_pending());
}

#[tokio::test]
async fn reconnect_resumes_without_second_approval() {
    let (_first, agent) = connected().await;

    let conn = connection(controller(BRAN), &agent);
    conn.connect().await.unwrap();
    assert_eq!(agent.with(|sim| sim.approvals), 1);
    assert_eq!(conn.controller().lock().await.state().sn, 1);
    conn.fetch("/identifiers", "GET", None, None).await.unwrap();
}

#[tokio::test]
async fn connect_uses_reported_rotation_index() {
    let (_first, agent) = connected().await;
    agent.with(|sim| sim.ridx = 5);

    let conn = connection(controller(BRAN), &agent);
    let result = conn.connect().await;
    assert!(matches!(result, Err(SignifyError::TrustEstablishment(_))));
    let ctrl = conn.controller().lock().await;
    assert_eq!(ctrl.ridx(), 0);
    assert_eq!(ctrl.state().sn, 0);
    drop(ctrl);
    assert!(conn.agent().await.is_none());
}

#[tokio::test]
async fn wrong_passcode_cannot_resume() {
    let (_first, agent) = connected().await;
    agent.with(|sim| {
        // point the agent at a controller derived elsewhere with the same prefix
        sim.ctrl.keys = vec![controller(NBRAN).signer().verfer().qb64()];
    });

    let conn = connection(controller(BRAN), &agent);
    assert!(matches!(
        conn.connect().await,
        Err(SignifyError::TrustEstablishment(_))
    ));
}

// ── Signed requests ─────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_requires_connection() {
    let ctrl = controller(BRAN);
    let agent = MockAgent::new(&ctrl);
    let conn = connection(ctrl, &agent);

    let result = conn.fetch("/identifiers", "GET", None, None).await;
    assert!(matches!(result, Err(SignifyError::Authentication(_))));
    assert!(agent.with(|sim| sim.signed.is_empty()));
}

#[tokio::test]
async fn fetch_signs_request_and_verifies_response() {
    let (conn, agent) = connected().await;

    let resp = conn
        .fetch("/identifiers?last=5", "GET", None, None)
        .await
        .unwrap();
    assert_eq!(resp.json().unwrap()["path"], "/identifiers?last=5");

    let body = json!({"name": "aid1"});
    let mut extra = Headers::new();
    extra.set("X-Request-Id", "42");
    extra.set("Signature", "indexed=\"?0\";signify=\"0Bforged\"");
    extra.set("Signify-Resource", "EForeign");
    conn.fetch("/identifiers", "POST", Some(&body), Some(&extra))
        .await
        .unwrap();

    let signed = agent.with(|sim| sim.signed.clone());
    assert_eq!(signed.len(), 2);
    assert_eq!(signed[1].0, "POST");
    assert_eq!(signed[1].2, body);
}

#[tokio::test]
async fn fetch_rejects_response_from_other_agent() {
    let (conn, agent) = connected().await;
    agent.with(|sim| sim.behaviour.foreign_resource = true);

    match conn.fetch("/identifiers", "GET", None, None).await {
        Err(SignifyError::Authentication(msg)) => assert!(msg.contains("different remote agent")),
        other => panic!("expected an authentication failure, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_rejects_forged_response() {
    let (conn, agent) = connected().await;
    agent.with(|sim| sim.behaviour.forge_responses = true);

    let result = conn.fetch("/identifiers", "GET", None, None).await;
    assert!(matches!(result, Err(SignifyError::Authentication(_))));
}

// ── Rotation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rotation_accepted_and_new_key_signs() {
    let (conn, agent) = connected().await;
    let old_key = conn.controller().lock().await.signer().verfer().qb64();

    conn.rotate(NBRAN, &[]).await.unwrap();

    let ctrl = conn.controller().lock().await;
    assert_eq!(ctrl.state().sn, 2);
    assert_ne!(ctrl.signer().verfer().qb64(), old_key);
    assert_eq!(agent.with(|sim| sim.ctrl.keys.clone()), ctrl.state().keys);

    let body = agent.with(|sim| sim.rotations[0].clone());
    let sealed = body["sxlt"].as_str().unwrap();
    let salt = sealing::open_qb64(ctrl.signer(), sealed).unwrap();
    assert_eq!(salt.as_str(), format!("0AA{NBRAN}"));
    drop(ctrl);

    // the agent now only accepts the rotated key
    conn.fetch("/identifiers", "GET", None, None).await.unwrap();
}

#[tokio::test]
async fn rejected_rotation_keeps_old_key() {
    let (conn, agent) = connected().await;
    let before = conn.controller().lock().await.state().clone();
    agent.with(|sim| sim.behaviour.reject_rotation = true);

    match conn.rotate(NBRAN, &[]).await {
        Err(SignifyError::Remote { status, .. }) => assert_eq!(status, Some(401)),
        other => panic!("expected a rejected rotation, got {other:?}"),
    }
    let ctrl = conn.controller().lock().await;
    assert_eq!(ctrl.state(), &before);
    assert!(!ctrl.has_pending());
    drop(ctrl);

    conn.fetch("/identifiers", "GET", None, None).await.unwrap();
}

#[tokio::test]
async fn rotation_lost_in_transport_is_abandoned() {
    let (conn, agent) = connected().await;
    agent.with(|sim| sim.behaviour.drop_rotation = true);

    match conn.rotate(NBRAN, &[]).await {
        Err(SignifyError::Remote { status, .. }) => assert!(status.is_none()),
        other => panic!("expected a transport failure, got {other:?}"),
    }
    assert_eq!(conn.controller().lock().await.state().sn, 1);

    // retrying once the agent is reachable again succeeds
    agent.with(|sim| sim.behaviour.drop_rotation = false);
    conn.rotate(NBRAN, &[]).await.unwrap();
    assert_eq!(conn.controller().lock().await.state().sn, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rotations_are_serialized() {
    let (conn, agent) = connected().await;
    let conn = Arc::new(conn);

    let a = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.rotate(NBRAN, &[]).await.map(|_| ()) })
    };
    let b = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.rotate(BRAN, &[]).await.map(|_| ()) })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(conn.controller().lock().await.state().sn, 3);
    assert_eq!(agent.with(|sim| sim.ctrl.sn), 3);
    assert_eq!(agent.with(|sim| sim.rotations.len()), 2);
}

#[tokio::test]
async fn rotation_reseals_managed_identifiers() {
    let (conn, agent) = connected().await;
    let codec = Codec::standard();
    let salt = "0AAbcdefghijklmnopqrstu1";
    let sxlt = {
        let ctrl = conn.controller().lock().await;
        sealing::seal_qb64(&codec, ctrl.signer().verfer(), salt).unwrap()
    };
    let managed = [ManagedIdentifier::Salty {
        prefix: "ESaltyManagedIdentifier".into(),
        sxlt,
    }];

    conn.rotate(NBRAN, &managed).await.unwrap();

    let body = agent.with(|sim| sim.rotations[0].clone());
    let resealed = body["keys"]["ESaltyManagedIdentifier"]["sxlt"].as_str().unwrap();
    let ctrl = conn.controller().lock().await;
    assert_eq!(sealing::open_qb64(ctrl.signer(), resealed).unwrap().as_str(), salt);
}

// ── Exchanges and external requests ─────────────────────────────────────────

#[tokio::test]
async fn send_exchange_posts_signed_message() {
    let (conn, agent) = connected().await;
    let member = KeyPair::from_seed(&Codec::standard(), &[3u8; 32], Tier::Low, true).unwrap();

    let mut payload = serde_json::Map::new();
    payload.insert("gid".into(), json!("EGroupPrefix"));
    let exchange = ExchangeBuilder::new("/multisig/icp", "EMemberPrefix")
        .payload(payload)
        .build(&Digester::default())
        .unwrap();

    conn.send_exchange("alice", "multisig", &exchange, &member, &["ERecipient".into()])
        .await
        .unwrap();

    let (method, path, body) = agent.with(|sim| sim.signed.last().cloned().unwrap());
    assert_eq!(method, "POST");
    assert_eq!(path, "/identifiers/alice/exchanges");
    assert_eq!(body["tpc"], "multisig");
    assert_eq!(body["exn"]["d"], exchange.exn.said());
    assert_eq!(body["atc"], "");
    assert_eq!(body["rec"], json!(["ERecipient"]));

    let sig = IndexedSignature::from_qb64(body["sigs"][0].as_str().unwrap()).unwrap();
    assert!(signing::verify_indexed(member.verfer(), exchange.exn.raw(), &sig));
}

#[tokio::test]
async fn signed_request_to_external_service() {
    let (conn, _agent) = connected().await;
    let signer = KeyPair::from_seed(&Codec::standard(), &[5u8; 32], Tier::Low, true).unwrap();

    let request = conn
        .create_signed_request(
            &signer,
            "EMemberPrefix",
            "https://witness.example:5631/oobi/EMemberPrefix?role=witness",
            "GET",
            Headers::new(),
        )
        .unwrap();

    assert_eq!(request.headers.get(HEADER_RESOURCE), Some("EMemberPrefix"));
    let verifier = Authenticator::new(signer.clone(), signer.verfer().clone());
    assert!(verifier.verify(&request.headers, "GET", "/oobi/EMemberPrefix"));
    assert!(!verifier.verify(&request.headers, "GET", "/oobi/ESomeoneElse"));
}

#[tokio::test]
async fn passcode_bookkeeping() {
    let (conn, agent) = connected().await;

    conn.save_old_passcode(BRAN).await.unwrap();
    conn.delete_passcode().await.unwrap();

    let calls = agent.with(|sim| sim.unsigned.clone());
    let salt_path = format!("/salt/{}", conn.pre());
    assert_eq!(calls[0], ("PUT".to_owned(), salt_path.clone(), json!({ "salt": BRAN })));
    assert_eq!(calls[1], ("DELETE".to_owned(), salt_path, Value::Null));
}
