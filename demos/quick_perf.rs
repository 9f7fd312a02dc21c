use handoff_queue::{ConcurrentQueue, LockFreeQueue, MutexQueue};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const MESSAGES: usize = 1_000_000;
const BUFFER_SIZE: usize = 1024;

fn main() {
    println!("Handoff Queue Performance Test");
    println!("==============================\n");

    for (producers, consumers) in [(1, 1), (4, 1), (1, 4), (4, 4)] {
        println!("{} Producer(s), {} Consumer(s) ({} messages):", producers, consumers, MESSAGES);

        let lock_free = Arc::new(LockFreeQueue::<usize>::with_capacity(BUFFER_SIZE).unwrap());
        report("lock-free", || run(lock_free, producers, consumers));

        let mutex = Arc::new(MutexQueue::<usize>::with_capacity(BUFFER_SIZE).unwrap());
        report("mutex", || run(mutex, producers, consumers));
        println!();
    }
}

fn report(name: &str, f: impl FnOnce()) {
    let start = Instant::now();
    f();
    let elapsed = start.elapsed();
    let throughput = MESSAGES as f64 / elapsed.as_secs_f64();
    println!("  [{}]", name);
    println!("    Time: {:?}", elapsed);
    println!("    Throughput: {:.2} msgs/sec", throughput);
    println!("    Latency: {:.0} ns/op", elapsed.as_nanos() as f64 / MESSAGES as f64);
}

fn run<Q: ConcurrentQueue<usize> + 'static>(queue: Arc<Q>, producers: usize, consumers: usize) {
    let per_producer = MESSAGES / producers;
    let per_consumer = MESSAGES / consumers;
    let mut handles = vec![];

    for p in 0..producers {
        let q = queue.clone();
        handles.push(thread::spawn(move || {
            for i in 0..per_producer {
                let mut item = p * per_producer + i;
                while let Err(full) = q.try_push(item) {
                    item = full.into_inner();
                    std::hint::spin_loop();
                }
            }
        }));
    }

    for _ in 0..consumers {
        let q = queue.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..per_consumer {
                while q.try_pop().is_none() {
                    std::hint::spin_loop();
                }
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
}
