use super::*;

#[post("/exercises/verify")]
pub async fn verify_exercise_handler(
    verifier: web::Data<Verifier>,
    job_queue: web::Data<JobQueue>,
    body: web::Json<VerifyRequest>,
) -> impl Responder {
    let request = body.into_inner();

    // Reject bad requests before they take a worker
    if let Err(e) = verifier.check(&request) {
        log::info!("Rejected verification for '{}': {e}", request.exercise_id);
        return verify_error_response(&e);
    }

    let (tx, rx) = oneshot::channel();
    let cancel = CancellationToken::new();
    // Cancels the job if this handler is dropped, e.g. on client disconnect
    let _cancel_guard = cancel.clone().drop_guard();

    let job_id = job_queue.next_id();
    job_queue.push(VerifyJob {
        id: job_id,
        request,
        cancel,
        responder: tx,
    });
    log::debug!("Sent job {job_id} to queue");

    match rx.await {
        Ok(Ok(report)) => {
            log::info!("Received final result of job {job_id}");
            HttpResponse::Ok().json(report)
        }
        Ok(Err(e)) => verify_error_response(&e),
        Err(e) => {
            log::error!("Failed to receive job {job_id} response: {e}");
            ErrorResponse::internal("Verification worker unavailable")
        }
    }
}
