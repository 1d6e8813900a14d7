use crate::error::{QueueError, Result};
use crate::model::{FrameSet, JobId, TaskRecord};
use crate::store::layout::Area;
use crate::store::records::{create_record, remove_record, write_record};
use crate::store::RenderQueue;

impl RenderQueue {
    /// Split a queued task into `parts` tasks with near-equal frame counts.
    ///
    /// The original task keeps the first chunk. The other chunks become new
    /// tasks with freshly reserved numbers: a number is never handed out
    /// twice for a job, even after the task holding it was deleted or
    /// combined away. Returns every resulting task number, original first.
    ///
    /// All pieces are written into the editing area next to the parked
    /// original and only then published, so the queue never holds the full
    /// original range and a chunk of it at the same time.
    pub fn split_task(&self, job_id: &JobId, task_no: u32, parts: usize) -> Result<Vec<u32>> {
        if parts < 2 {
            return Err(QueueError::InvalidArgument(
                "a task must be split into at least two parts".to_string(),
            ));
        }
        let extra = u32::try_from(parts - 1)
            .map_err(|_| QueueError::InvalidArgument(format!("cannot split into {} tasks", parts)))?;

        self.stage(job_id, task_no, "split")?;
        let plan = self.read_staged(job_id, &[task_no]).and_then(|mut records| {
            let record = records.swap_remove(0);
            let chunks = record.frame_set()?.chunks(parts).ok_or_else(|| {
                QueueError::InvalidArgument(format!(
                    "cannot split frames '{}' into {} tasks",
                    record.frames, parts
                ))
            })?;
            Ok((record, chunks))
        });
        let (original, chunks) = match plan {
            Ok(plan) => plan,
            Err(e) => {
                self.unstage(job_id, &[task_no]);
                return Err(e);
            }
        };

        let first = match self.reserve_task_numbers(job_id, extra) {
            Ok(first) => first,
            Err(e) => {
                self.unstage(job_id, &[task_no]);
                return Err(e);
            }
        };

        let mut created = Vec::with_capacity(chunks.len() - 1);
        if let Err(e) = self.write_pieces(job_id, &original, &chunks, first, &mut created) {
            for &piece in &created {
                let path = self.layout().task_file(&Area::Editing, job_id, piece);
                if let Err(e) = remove_record(&path) {
                    tracing::warn!(job_id = %job_id, task_no = piece, error = %e, "Could not discard split piece");
                }
            }
            self.restore(job_id, &[task_no], std::slice::from_ref(&original));
            return Err(e);
        }

        // From here every parked record is in its final form.
        self.publish(job_id, task_no)?;
        for &piece in &created {
            self.publish(job_id, piece)?;
        }

        let mut numbers = Vec::with_capacity(parts);
        numbers.push(task_no);
        numbers.extend(created);
        tracing::info!(job_id = %job_id, task_no, parts, tasks = ?numbers, "Task split");
        Ok(numbers)
    }

    /// Write the new pieces, then shrink the original to the first chunk,
    /// all inside the editing area. `created` collects the pieces written.
    fn write_pieces(
        &self,
        job_id: &JobId,
        original: &TaskRecord,
        chunks: &[FrameSet],
        first: u32,
        created: &mut Vec<u32>,
    ) -> Result<()> {
        for (offset, chunk) in chunks[1..].iter().enumerate() {
            // Within the reserved block, so this cannot overflow.
            let task_no = first + offset as u32;
            let mut piece = original.clone();
            piece.task_no = task_no;
            piece.frames = chunk.to_string();

            let path = self.layout().task_file(&Area::Editing, job_id, task_no);
            if !create_record(&path, &piece)? {
                return Err(QueueError::Internal(format!(
                    "reserved task {} of job {} already exists",
                    task_no, job_id
                )));
            }
            created.push(task_no);
        }

        let mut head = original.clone();
        head.frames = chunks[0].to_string();
        write_record(
            &self.layout().task_file(&Area::Editing, job_id, original.task_no),
            &head,
        )
    }
}
