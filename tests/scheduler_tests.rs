mod test_harness;

use render_queue::model::{TaskReport, WorkerId};
use render_queue::QueueError;
use test_harness::{tick, TestQueue};

#[test]
fn test_dequeue_job_empty_queue() {
    let t = TestQueue::new();
    assert!(t.queue.dequeue_job().unwrap().is_none());
}

#[test]
fn test_dequeue_job_prefers_highest_priority() {
    let t = TestQueue::new();
    t.submit("low", 10, &["1"]);
    let high = t.submit("high", 90, &["1"]);
    t.submit("mid", 50, &["1"]);

    assert_eq!(t.queue.dequeue_job().unwrap().unwrap().id, high);
}

#[test]
fn test_dequeue_job_breaks_ties_by_submission_time() {
    let t = TestQueue::new();
    let first = t.submit("first", 50, &["1"]);
    tick();
    t.submit("second", 50, &["1"]);

    assert_eq!(t.queue.dequeue_job().unwrap().unwrap().id, first);
}

#[test]
fn test_dequeue_job_skips_jobs_without_queued_tasks() {
    let t = TestQueue::new();
    let done = t.submit("done", 100, &["1", "2"]);
    let waiting = t.submit("waiting", 1, &["1"]);

    t.queue.complete_task(&done, 0, &TaskReport::default()).unwrap();
    t.queue.fail_task(&done, 1, &TaskReport::default()).unwrap();

    assert_eq!(t.queue.dequeue_job().unwrap().unwrap().id, waiting);
}

#[test]
fn test_dequeue_task_takes_lowest_task_number() {
    let t = TestQueue::new();
    let worker = t.register("node01");
    let job_id = t.submit("shot_010", 50, &["1-10", "11-20", "21-30"]);
    t.queue.complete_task(&job_id, 0, &TaskReport::default()).unwrap();

    let claimed = t.queue.dequeue_task(&worker).unwrap().unwrap();
    assert_eq!(claimed.job_id(), &job_id);
    assert_eq!(claimed.task_no(), 1);
    assert_eq!(claimed.frames(), "11-20");
    assert_eq!(claimed.job.name, "shot_010");

    let claimed = t.queue.dequeue_task(&worker).unwrap().unwrap();
    assert_eq!(claimed.task_no(), 2);
    assert!(t.queue.dequeue_task(&worker).unwrap().is_none());

    assert_eq!(
        t.statuses(&job_id),
        vec![(0, "Done"), (1, "Working"), (2, "Working")]
    );
}

#[test]
fn test_priority_change_reorders_work() {
    let t = TestQueue::new();
    let worker = t.register("node01");
    t.submit("a", 50, &["1"]);
    let b = t.submit("b", 40, &["1"]);

    t.queue.set_job_priority(&b, 60).unwrap();
    assert_eq!(t.queue.dequeue_task(&worker).unwrap().unwrap().job_id(), &b);
}

#[test]
fn test_dequeue_task_requires_registered_worker() {
    let t = TestQueue::new();
    t.submit("shot_010", 50, &["1-10"]);

    let err = t.queue.dequeue_task(&WorkerId::new()).unwrap_err();
    assert!(matches!(err, QueueError::WorkerNotFound(_)));
}

#[test]
fn test_deleted_job_is_not_scheduled() {
    let t = TestQueue::new();
    let worker = t.register("node01");
    let job_id = t.submit("shot_010", 90, &["1-10"]);
    let other = t.submit("other", 10, &["1-10"]);

    t.queue.delete_job(&job_id).unwrap();
    assert_eq!(t.queue.dequeue_task(&worker).unwrap().unwrap().job_id(), &other);
}
