use handoff_queue::{init_tracing, Backoff, Queue, QueueConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn push_retry(queue: &Queue<String>, item: String) {
    let mut item = item;
    while let Err(full) = queue.try_push(item) {
        item = full.into_inner();
        thread::yield_now();
    }
}

fn main() {
    init_tracing();
    println!("Work Queue Example\n");

    const NUM_WORKERS: usize = 4;
    const NUM_JOBS: usize = 20;

    let config = QueueConfig::new()
        .with_capacity(128)
        .with_backoff(Backoff::SpinThenYield { spin_limit: 16 });
    let jobs = Arc::new(Queue::<String>::with_config(config).expect("valid config"));
    let results = Arc::new(Queue::<String>::with_config(config).expect("valid config"));
    let producer_done = Arc::new(AtomicBool::new(false));

    let jobs_tx = jobs.clone();
    let done = producer_done.clone();
    let producer = thread::spawn(move || {
        for i in 0..NUM_JOBS {
            let job = format!("Job-{:02}", i);
            println!("Enqueued: {}", job);
            push_retry(&jobs_tx, job);
            thread::sleep(Duration::from_millis(50));
        }
        done.store(true, Ordering::Release);
        println!("All jobs enqueued!");
    });

    let mut workers = vec![];
    for worker_id in 0..NUM_WORKERS {
        let jobs_rx = jobs.clone();
        let results_tx = results.clone();
        let done = producer_done.clone();

        workers.push(thread::spawn(move || {
            let mut processed = 0;
            loop {
                match jobs_rx.try_pop() {
                    Some(job) => {
                        println!("Worker {} processing: {}", worker_id, job);
                        thread::sleep(Duration::from_millis(200));
                        push_retry(&results_tx, format!("{} -> completed by worker {}", job, worker_id));
                        processed += 1;
                    }
                    None => {
                        // Snapshot is only a hint, but once the producer is
                        // done an empty read means the work is gone.
                        if done.load(Ordering::Acquire) && jobs_rx.was_empty() {
                            break;
                        }
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }
            println!("Worker {} finished ({} jobs)", worker_id, processed);
        }));
    }

    let results_rx = results.clone();
    let collector = thread::spawn(move || {
        let mut collected = 0;
        while collected < NUM_JOBS {
            match results_rx.try_pop() {
                Some(result) => {
                    println!("Result: {}", result);
                    collected += 1;
                }
                None => std::hint::spin_loop(),
            }
        }
        println!("All results collected!");
    });

    producer.join().unwrap();
    for worker in workers {
        worker.join().unwrap();
    }
    collector.join().unwrap();

    println!("\nWork queue example completed!");
}
