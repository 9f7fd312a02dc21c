//! Simple usage example

use handoff_queue::{init_tracing, Queue};
use std::sync::Arc;
use std::thread;

fn main() {
    init_tracing();
    println!("Handoff queue - Simple Example\n");

    let queue = Arc::new(Queue::<String>::with_capacity(64).expect("valid capacity"));

    let producer_queue = queue.clone();
    let consumer_queue = queue.clone();

    let producer = thread::spawn(move || {
        for i in 0..10 {
            let mut message = format!("Message {}", i);
            println!("Sending: {}", message);

            // A full queue hands the message back; retry with it.
            while let Err(full) = producer_queue.try_push(message) {
                message = full.into_inner();
                std::hint::spin_loop();
            }

            thread::sleep(std::time::Duration::from_millis(100));
        }
        println!("Producer finished!");
    });

    let consumer = thread::spawn(move || {
        for _ in 0..10 {
            loop {
                match consumer_queue.try_pop() {
                    Some(message) => {
                        println!("Received: {}", message);
                        break;
                    }
                    None => std::hint::spin_loop(),
                }
            }
        }
        println!("Consumer finished!");
    });

    producer.join().unwrap();
    consumer.join().unwrap();

    println!("\nExample completed successfully!");
}
