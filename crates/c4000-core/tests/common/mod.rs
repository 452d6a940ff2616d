// Stateful stand-in for the modem's CGI endpoints.
//
// Holds a rule table and a host table behind a mutex and answers
// cgi_action / cgi_get / cgi_set the way the firmware does, including
// ghost rows that ignore `Del`, reads that fail, come back `null` or
// replay a stale table, and writes that fail with or without taking effect.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use url::form_urlencoded;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use c4000_api::{
    Credentials, RetryPolicy, SessionClient, SessionConfig, TlsMode, TransportConfig,
};
use c4000_core::ReconcilerConfig;

pub const FILTER: &str = "Device.Firewall.X_LANTIQ_COM_URLFilter";
pub const HOSTS: &str = "Device.Hosts.Host";

#[derive(Debug, Clone)]
pub struct StoredRule {
    pub id: String,
    pub url: String,
    pub mac: String,
}

#[derive(Debug, Default)]
pub struct RouterState {
    pub rules: Vec<StoredRule>,
    pub hosts: Vec<(String, String, String)>,
    pub next_id: u32,
    /// Ids that survive `Del`.
    pub ghosts: HashSet<String>,
    /// Every cgi_set form, in order.
    pub writes: Vec<Vec<(String, String)>>,
    pub rule_reads: usize,
    pub host_reads: usize,
    /// Next N reads answer 500.
    pub failing_reads: u32,
    /// Next N reads answer `null`.
    pub null_reads: u32,
    pub hosts_unavailable: bool,
    /// Next N `Del`s leave the pre-delete table to be served on the
    /// following rule read.
    pub stale_after_delete: u32,
    stale: Option<Vec<StoredRule>>,
    /// Next N writes answer 500.
    pub failing_writes: u32,
    /// Whether a failing write is still applied before the 500.
    pub apply_failing_writes: bool,
    /// Every cgi_set request, applied or not.
    pub set_calls: usize,
}

impl RouterState {
    pub fn deletes(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| w.iter().any(|(k, v)| k == "Operation" && v == "Del"))
            .count()
    }

    pub fn adds(&self) -> Vec<&Vec<(String, String)>> {
        self.writes
            .iter()
            .filter(|w| w.iter().any(|(k, v)| k == "Operation" && v == "Add"))
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct Router {
    pub state: Arc<Mutex<RouterState>>,
}

impl Router {
    pub fn with_rule(self, id: &str, domain: &str, mac: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.rules.push(StoredRule {
                id: id.into(),
                url: format!("http://{domain}"),
                mac: mac.into(),
            });
            let numeric: u32 = id.parse().unwrap_or(0);
            state.next_id = state.next_id.max(numeric);
        }
        self
    }

    pub fn with_ghost(self, id: &str) -> Self {
        self.state.lock().unwrap().ghosts.insert(id.into());
        self
    }

    pub fn with_host(self, name: &str, ip: &str, mac: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .hosts
            .push((name.into(), ip.into(), mac.into()));
        self
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap()
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(any())
            .respond_with(self.clone())
            .mount(server)
            .await;
    }
}

fn param(name: &str, value: &str) -> Value {
    json!({"ParamName": name, "ParamValue": value})
}

impl RouterState {
    fn rules_body(rules: &[StoredRule]) -> Value {
        let mut objects = vec![json!({"ObjName": format!("{FILTER}."), "Param": [param("Enable", "1")]})];
        for rule in rules {
            let encoded: String = form_urlencoded::byte_serialize(rule.url.as_bytes()).collect();
            objects.push(json!({
                "ObjName": format!("{FILTER}.Rule.{}.", rule.id),
                "Param": [param("URL", &encoded), param("MACAddress", &rule.mac)],
            }));
        }
        json!({ "Objects": objects })
    }

    fn hosts_body(&self) -> Value {
        let objects: Vec<Value> = self
            .hosts
            .iter()
            .enumerate()
            .map(|(i, (name, ip, mac))| {
                json!({
                    "ObjName": format!("{HOSTS}.{}.", i + 1),
                    "Param": [param("HostName", name), param("IPAddress", ip), param("PhysAddress", mac)],
                })
            })
            .collect();
        json!({ "Objects": objects })
    }

    fn apply(&mut self, form: Vec<(String, String)>) {
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        match get("Operation").as_str() {
            "Add" => {
                self.next_id += 1;
                self.rules.push(StoredRule {
                    id: self.next_id.to_string(),
                    url: get("URL"),
                    mac: get("MACAddress"),
                });
            }
            "Del" => {
                let object = get("Object");
                let id = object.trim_end_matches('.').rsplit('.').next().unwrap_or_default().to_owned();
                if self.stale_after_delete > 0 {
                    self.stale_after_delete -= 1;
                    self.stale = Some(self.rules.clone());
                }
                if !self.ghosts.contains(&id) {
                    self.rules.retain(|r| r.id != id);
                }
            }
            _ => {}
        }
        self.writes.push(form);
    }
}

impl Respond for Router {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        match request.url.path() {
            "/cgi/cgi_action" => ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "Session-Id=sim; Path=/"),
            "/cgi/cgi_get" => {
                let object = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "Object")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                if object == HOSTS {
                    state.host_reads += 1;
                    if state.hosts_unavailable {
                        return ResponseTemplate::new(503);
                    }
                    return ResponseTemplate::new(200).set_body_json(state.hosts_body());
                }
                state.rule_reads += 1;
                if state.failing_reads > 0 {
                    state.failing_reads -= 1;
                    return ResponseTemplate::new(500);
                }
                if state.null_reads > 0 {
                    state.null_reads -= 1;
                    return ResponseTemplate::new(200).set_body_string("null");
                }
                let body = match state.stale.take() {
                    Some(stale) => RouterState::rules_body(&stale),
                    None => RouterState::rules_body(&state.rules),
                };
                ResponseTemplate::new(200).set_body_json(body)
            }
            "/cgi/cgi_set" => {
                let form = form_urlencoded::parse(&request.body).into_owned().collect();
                state.set_calls += 1;
                if state.failing_writes > 0 {
                    state.failing_writes -= 1;
                    if state.apply_failing_writes {
                        state.apply(form);
                    }
                    return ResponseTemplate::new(500);
                }
                state.apply(form);
                ResponseTemplate::new(200)
            }
            _ => ResponseTemplate::new(404),
        }
    }
}

// ── Client setup ────────────────────────────────────────────────────

pub fn fast_reconciler() -> ReconcilerConfig {
    ReconcilerConfig {
        max_retries: c4000_core::MAX_RETRIES,
        error_backoff: Duration::ZERO,
        removal_pause: Duration::ZERO,
    }
}

pub async fn connect(router: &Router) -> (MockServer, SessionClient) {
    let server = MockServer::start().await;
    router.mount(&server).await;

    let config = SessionConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        transport: TransportConfig {
            tls: TlsMode::System,
            timeout: Duration::from_secs(5),
            cookie_jar: None,
            min_interval: Duration::ZERO,
            retry: RetryPolicy {
                read_attempts: 3,
                backoff_step: Duration::from_millis(1),
            },
        },
        post_write_delay: Duration::ZERO,
    };
    let credentials = Credentials {
        username: "admin".into(),
        password: SecretString::from("password".to_string()),
    };
    let client = SessionClient::new(config, credentials).unwrap();
    assert!(client.login().await);
    (server, client)
}
