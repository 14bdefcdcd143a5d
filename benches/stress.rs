use std::sync::Arc;
use std::time::{Duration, Instant};

use ulid::Ulid;

use fleetplan::config::EngineConfig;
use fleetplan::engine::Engine;
use fleetplan::model::*;
use fleetplan::principal::Principal;
use fleetplan::source::{InMemoryStore, Sources};

const HOUR: i64 = 3_600_000; // 1 hour in ms
/// 2026-01-01T00:00:00Z
const T0: Ms = 1_767_225_600_000;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

/// One agency with `vehicles` cars, each booked back to back with a
/// two-hour turnaround gap for a year, plus a few duplicate records.
fn setup(vehicles: usize) -> (Arc<InMemoryStore>, Ulid, Vec<Ulid>) {
    let store = Arc::new(InMemoryStore::new());
    let agency = Ulid::new();
    let mut ids = Vec::with_capacity(vehicles);

    for n in 0..vehicles {
        let id = Ulid::new();
        store.insert_vehicle(VehicleRecord {
            id,
            agency_id: agency,
            registration_number: format!("FP-{n:04}"),
            updated_at: T0,
        });
        if n % 10 == 0 {
            store.insert_vehicle(VehicleRecord {
                id: Ulid::new(),
                agency_id: agency,
                registration_number: format!("fp {n:04}"),
                updated_at: T0 - HOUR,
            });
        }
        let mut start = T0 + (n as i64 % 24) * HOUR;
        for _ in 0..365 {
            store.insert_booking(BookingRecord {
                id: Ulid::new(),
                vehicle_id: id,
                start,
                end: start + 22 * HOUR,
                status: BookingStatus::Confirmed,
            });
            start += 24 * HOUR;
        }
        ids.push(id);
    }

    println!("  created {} vehicles ({} records)", ids.len(), store.vehicle_count());
    (store, agency, ids)
}

async fn bench_check_availability(engine: Arc<Engine>, ids: &[Ulid], tasks: usize, per_task: usize) {
    let started = Instant::now();
    let mut handles = Vec::new();
    for t in 0..tasks {
        let engine = engine.clone();
        let ids = ids.to_vec();
        handles.push(tokio::spawn(async move {
            let admin = Principal::super_admin();
            let mut latencies = Vec::with_capacity(per_task);
            for i in 0..per_task {
                let vehicle = ids[(t * per_task + i) % ids.len()];
                let start = T0 + ((i as i64 * 7) % (300 * 24)) * HOUR;
                let q = Instant::now();
                if engine
                    .check_availability(&admin, vehicle, start, start + 3 * HOUR)
                    .await
                    .is_ok()
                {
                    latencies.push(q.elapsed());
                }
            }
            latencies
        }));
    }
    let mut all = Vec::new();
    for h in handles {
        if let Ok(l) = h.await {
            all.extend(l);
        }
    }
    let elapsed = started.elapsed();
    println!(
        "  check_availability: {:.0} queries/s over {tasks} tasks",
        all.len() as f64 / elapsed.as_secs_f64()
    );
    print_latency("check_availability", &mut all);
}

async fn bench_next_availability(engine: &Engine, ids: &[Ulid], n: usize) {
    let admin = Principal::super_admin();
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let vehicle = ids[i % ids.len()];
        let q = Instant::now();
        if engine.next_availability(&admin, vehicle, T0 + i as i64 * HOUR).await.is_ok() {
            latencies.push(q.elapsed());
        }
    }
    print_latency("next_availability", &mut latencies);
}

async fn bench_available_vehicles(engine: &Engine, agency: Ulid, n: usize) {
    let admin = Principal::super_admin();
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let start = T0 + i as i64 * 5 * HOUR;
        let q = Instant::now();
        if engine
            .available_vehicles(&admin, agency, start, start + HOUR)
            .await
            .is_ok()
        {
            latencies.push(q.elapsed());
        }
    }
    print_latency("available_vehicles", &mut latencies);
}

fn main() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    rt.block_on(async {
        println!("fleetplan stress");
        let (store, agency, ids) = setup(200);
        let engine = Arc::new(Engine::new(Sources::from_store(store), EngineConfig::default()));

        bench_check_availability(engine.clone(), &ids, 16, 500).await;
        bench_next_availability(&engine, &ids, 2_000).await;
        bench_available_vehicles(&engine, agency, 50).await;
    });
}
