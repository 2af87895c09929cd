/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Registries shared between threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use gridport::dal::DatabaseResourceProvider;
use gridport::registry::{FileResourceProvider, MemoryResourceProvider};
use gridport::{Application, Queue, Resource, ResourceProvider};
use tempfile::TempDir;

use crate::fixtures::cluster_a;

/// clusterA with `n` applications and `n` queues.
fn cluster_with(n: usize) -> Resource {
    let mut resource = Resource::new("moab", "clusterA").unwrap();
    for i in 0..n {
        resource
            .add_application(Application::new("sim", format!("{}.0", i), "/bin/sim").unwrap())
            .unwrap();
        resource.add_queue(Queue::new(format!("q{}", i)).unwrap()).unwrap();
    }
    resource
}

#[test]
fn test_readers_only_observe_whole_states() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(FileResourceProvider::new(temp_dir.path().join("resources.xml")));
    provider.add_resource(cluster_with(1)).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let provider = Arc::clone(&provider);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0;
                while !done.load(Ordering::SeqCst) {
                    for resource in provider.get_resources().unwrap() {
                        // Every save swaps applications and queues together.
                        assert_eq!(resource.application_count(), resource.queue_count());
                        assert!(matches!(resource.application_count(), 1 | 3));
                    }
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for round in 0..200 {
        let next = if round % 2 == 0 { 3 } else { 1 };
        provider.save_resource(cluster_with(next)).unwrap();
        if round % 50 == 0 {
            provider.commit_changes().unwrap();
        }
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_racing_duplicate_adds_admit_exactly_one() {
    let provider = Arc::new(MemoryResourceProvider::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.add_resource(cluster_a()))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.is_duplicate()));
    assert_eq!(provider.get_resources().unwrap().len(), 1);
}

#[test]
fn test_database_accepts_parallel_writers() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(
        DatabaseResourceProvider::new(temp_dir.path().join("registry.db").display().to_string())
            .with_pool_size(4),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                let mut resource = Resource::new("moab", format!("node{}", i)).unwrap();
                resource.add_queue(Queue::new("batch").unwrap()).unwrap();
                provider.add_resource(resource)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let resources = provider.get_resources().unwrap();
    assert_eq!(resources.len(), 4);
    assert!(resources.iter().all(|r| r.contains_queue("batch")));
}
