use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::http::probe::ProbeCall;

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Phase & Category
// ---------------------------------------------------------------------------

/// One workload phase. Phases execute strictly in the order of [`Phase::ALL`]
/// and every target sees the identical sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Basic,
    ReadAll,
    ReadOne,
    Create,
    Update,
    Delete,
    StressCpu,
    StressMemory,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Basic,
        Phase::ReadAll,
        Phase::ReadOne,
        Phase::Create,
        Phase::Update,
        Phase::Delete,
        Phase::StressCpu,
        Phase::StressMemory,
    ];

    /// Stable machine name used as a key in the persisted report.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Basic => "basic",
            Phase::ReadAll => "read_all",
            Phase::ReadOne => "read_one",
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Delete => "delete",
            Phase::StressCpu => "stress_cpu",
            Phase::StressMemory => "stress_memory",
        }
    }

    /// Human-readable label for console tables.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Basic => "Basic endpoints",
            Phase::ReadAll => "DB read (list)",
            Phase::ReadOne => "DB read (by id)",
            Phase::Create => "DB create",
            Phase::Update => "DB update",
            Phase::Delete => "DB delete",
            Phase::StressCpu => "CPU stress",
            Phase::StressMemory => "Memory stress",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Phase::Basic => Category::BasicOperations,
            Phase::ReadAll | Phase::ReadOne => Category::DatabaseRead,
            Phase::Create | Phase::Update | Phase::Delete => Category::DatabaseWrite,
            Phase::StressCpu | Phase::StressMemory => Category::Stress,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static grouping of phases for the category-winner summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BasicOperations,
    DatabaseRead,
    DatabaseWrite,
    Stress,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::BasicOperations,
        Category::DatabaseRead,
        Category::DatabaseWrite,
        Category::Stress,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::BasicOperations => "basic_operations",
            Category::DatabaseRead => "database_read",
            Category::DatabaseWrite => "database_write",
            Category::Stress => "stress_tests",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::BasicOperations => "Basic Operations",
            Category::DatabaseRead => "Database READ",
            Category::DatabaseWrite => "Database WRITE",
            Category::Stress => "Stress Tests",
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        Phase::ALL
            .iter()
            .copied()
            .filter(|p| p.category() == *self)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// RequestSpec
// ---------------------------------------------------------------------------

/// How the JSON body for a request is produced.
#[derive(Debug, Clone)]
pub enum BodySpec {
    Empty,
    Fixed(serde_json::Value),
    /// Fresh synthetic item payload per iteration.
    SyntheticItem,
}

/// Template for one logical call within a phase. Paths are relative to the
/// target's base URL and already carry their seed ids where needed.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub label: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub body: BodySpec,
}

impl RequestSpec {
    pub fn get(label: &'static str, path: &'static str) -> Self {
        Self {
            label,
            method: HttpMethod::Get,
            path,
            body: BodySpec::Empty,
        }
    }

    /// Resolve this spec into a dispatchable call for one iteration.
    pub fn materialize(&self, base_url: &str, iteration: usize) -> ProbeCall {
        let url = join_url(base_url, self.path);
        match &self.body {
            BodySpec::Empty => ProbeCall::new(self.method, url),
            BodySpec::Fixed(value) => ProbeCall::with_body(self.method, url, value.clone()),
            BodySpec::SyntheticItem => {
                ProbeCall::with_body(self.method, url, synthetic_item(iteration))
            }
        }
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Synthetic `{name, description, price}` payload for CREATE/UPDATE calls.
/// The price varies per call so payloads are never byte-identical.
fn synthetic_item(iteration: usize) -> serde_json::Value {
    let price = rand::thread_rng().gen_range(1.0_f64..1000.0);
    serde_json::json!({
        "name": format!("restmark item {iteration}"),
        "description": "synthetic record created during benchmarking",
        "price": (price * 100.0).round() / 100.0,
    })
}

// ---------------------------------------------------------------------------
// PhasePlan
// ---------------------------------------------------------------------------

/// A phase plus its request volume and concurrency ceiling. When a phase has
/// several specs, iterations round-robin across them.
#[derive(Debug, Clone)]
pub struct PhasePlan {
    pub phase: Phase,
    pub specs: Vec<RequestSpec>,
    pub requests: usize,
    pub concurrency: usize,
}

impl PhasePlan {
    /// Materialize the call for the given iteration index.
    pub fn call_for(&self, base_url: &str, iteration: usize) -> ProbeCall {
        let spec = &self.specs[iteration % self.specs.len()];
        spec.materialize(base_url, iteration)
    }
}

/// Build the full ordered phase list for a run.
///
/// Write and stress phases run reduced volumes so the benchmark neither
/// bloats the target database nor pins its CPU for the whole run: writes are
/// a tenth of the request count capped at 100 (concurrency capped at 10),
/// CPU stress a fifth at half concurrency, memory stress a tenth at a fifth
/// of the concurrency.
pub fn build_phase_plans(total_requests: usize, concurrency: usize) -> Vec<PhasePlan> {
    let write_requests = (total_requests / 10).clamp(1, 100);
    let write_concurrency = concurrency.clamp(1, 10);
    let cpu_requests = (total_requests / 5).max(1);
    let cpu_concurrency = (concurrency / 2).max(1);
    let mem_requests = (total_requests / 10).max(1);
    let mem_concurrency = (concurrency / 5).max(1);

    vec![
        PhasePlan {
            phase: Phase::Basic,
            specs: vec![
                RequestSpec::get("root", "/"),
                RequestSpec::get("health", "/health"),
                RequestSpec {
                    label: "echo_post",
                    method: HttpMethod::Post,
                    path: "/echo",
                    body: BodySpec::Fixed(serde_json::json!({
                        "message": "restmark benchmark",
                        "data": {"number": 42},
                    })),
                },
                RequestSpec::get("echo_get", "/echo/benchmark-test"),
            ],
            requests: total_requests,
            concurrency,
        },
        PhasePlan {
            phase: Phase::ReadAll,
            specs: vec![RequestSpec::get("list_items", "/db/items")],
            requests: total_requests,
            concurrency,
        },
        PhasePlan {
            phase: Phase::ReadOne,
            specs: vec![RequestSpec::get("get_item", "/db/items/1")],
            requests: total_requests,
            concurrency,
        },
        PhasePlan {
            phase: Phase::Create,
            specs: vec![RequestSpec {
                label: "create_item",
                method: HttpMethod::Post,
                path: "/db/items",
                body: BodySpec::SyntheticItem,
            }],
            requests: write_requests,
            concurrency: write_concurrency,
        },
        PhasePlan {
            phase: Phase::Update,
            specs: vec![RequestSpec {
                label: "update_item",
                method: HttpMethod::Put,
                path: "/db/items/1",
                body: BodySpec::SyntheticItem,
            }],
            requests: write_requests,
            concurrency: write_concurrency,
        },
        PhasePlan {
            phase: Phase::Delete,
            specs: vec![RequestSpec {
                label: "delete_item",
                method: HttpMethod::Delete,
                path: "/db/items/2",
                body: BodySpec::Empty,
            }],
            requests: write_requests,
            concurrency: write_concurrency,
        },
        PhasePlan {
            phase: Phase::StressCpu,
            specs: vec![RequestSpec::get("cpu_stress", "/stress/cpu/1000")],
            requests: cpu_requests,
            concurrency: cpu_concurrency,
        },
        PhasePlan {
            phase: Phase::StressMemory,
            specs: vec![RequestSpec::get("memory_stress", "/stress/memory/1")],
            requests: mem_requests,
            concurrency: mem_concurrency,
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
