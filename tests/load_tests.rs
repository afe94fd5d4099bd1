#[cfg(test)]
mod tests {
    use bounded_pool::{
        pool::{Config, WorkerPool},
        task, BoundedChannel,
    };
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        thread,
        time::{Duration, Instant},
    };

    fn measure<T>(name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        println!("✓ {}: {:?}", name, start.elapsed());
        result
    }

    fn wait_for(pool: &WorkerPool, finished: usize, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while pool.metrics().finished() < finished {
            assert!(Instant::now() < deadline, "pool did not drain in {:?}", timeout);
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn load_test_1_hundred_tasks_three_workers() {
        println!("\n=== LOAD TEST 1: 100 задач на 3 воркерах ===");
        let pool = WorkerPool::new(3, 10).unwrap();
        let collector = Arc::new(Mutex::new(Vec::new()));

        measure("100 tasks", || {
            for id in 0..100 {
                let collector = collector.clone();
                pool.submit(task::from_fn(format!("collect-{}", id), move || {
                    collector.lock().unwrap().push(id);
                    Ok(())
                }));
            }
            wait_for(&pool, 100, Duration::from_secs(10));
        });

        let seen = collector.lock().unwrap();
        assert_eq!(seen.len(), 100);
        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique, (0..100).collect::<HashSet<_>>());
    }

    #[test]
    fn load_test_2_single_worker_preserves_order() {
        println!("\n=== LOAD TEST 2: один воркер выполняет задачи в порядке отправки ===");
        let pool = WorkerPool::new(1, 4).unwrap();
        let collector = Arc::new(Mutex::new(Vec::new()));

        for id in 0..500 {
            let collector = collector.clone();
            pool.submit(task::from_fn(format!("ordered-{}", id), move || {
                collector.lock().unwrap().push(id);
                Ok(())
            }));
        }
        wait_for(&pool, 500, Duration::from_secs(10));

        assert_eq!(*collector.lock().unwrap(), (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn load_test_3_mpmc_channel_no_loss_no_duplication() {
        println!("\n=== LOAD TEST 3: 4 производителя x 4 потребителя, ёмкость 8 ===");
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 5_000;
        let channel = BoundedChannel::new(8).unwrap();

        let received: Vec<Vec<(usize, usize)>> = measure("20k items", || {
            crossbeam::thread::scope(|s| {
                for producer in 0..PRODUCERS {
                    let channel = &channel;
                    s.spawn(move |_| {
                        for seq in 0..PER_PRODUCER {
                            channel.enqueue((producer, seq));
                        }
                    });
                }

                let consumers: Vec<_> = (0..4)
                    .map(|_| {
                        s.spawn(|_| {
                            (0..PRODUCERS * PER_PRODUCER / 4)
                                .map(|_| channel.dequeue())
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();

                consumers
                    .into_iter()
                    .map(|c| c.join().unwrap())
                    .collect::<Vec<_>>()
            })
            .unwrap()
        });

        // каждый потребитель видит элементы любого производителя по возрастанию
        for items in &received {
            let mut last = [None; PRODUCERS];
            for &(producer, seq) in items {
                if let Some(prev) = last[producer] {
                    assert!(seq > prev, "producer {} reordered: {} after {}", producer, seq, prev);
                }
                last[producer] = Some(seq);
            }
        }

        let all: HashSet<_> = received.into_iter().flatten().collect();
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
        assert!(channel.is_empty());
    }

    #[test]
    fn load_test_4_concurrent_submitters_with_failures() {
        println!("\n=== LOAD TEST 4: 4 отправителя, каждая 7-я задача падает ===");
        let pool = WorkerPool::with_config(
            Config {
                num_workers: 4,
                capacity: 16,
                ..Config::default()
            }
            .on_failure(|_| {}),
        )
        .unwrap();
        let collector = Arc::new(Mutex::new(Vec::new()));

        measure("2k tasks", || {
            crossbeam::thread::scope(|s| {
                for submitter in 0..4 {
                    let pool = &pool;
                    let collector = &collector;
                    s.spawn(move |_| {
                        for n in 0..500 {
                            let id = submitter * 500 + n;
                            let collector = collector.clone();
                            pool.submit(task::from_fn(format!("job-{}", id), move || {
                                anyhow::ensure!(id % 7 != 0, "job {} rejected", id);
                                collector.lock().unwrap().push(id);
                                Ok(())
                            }));
                        }
                    });
                }
            })
            .unwrap();
            wait_for(&pool, 2_000, Duration::from_secs(20));
        });

        let metrics = pool.metrics();
        let expected_failures = (0..2_000).filter(|id| id % 7 == 0).count();
        assert_eq!(metrics.submitted, 2_000);
        assert_eq!(metrics.failed, expected_failures);
        assert_eq!(metrics.completed, 2_000 - expected_failures);
        assert_eq!(collector.lock().unwrap().len(), 2_000 - expected_failures);
        println!("  Успешно: {:.1}%", metrics.success_rate() * 100.0);
    }
}
