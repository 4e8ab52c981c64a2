use super::*;

#[get("/exercises")]
pub async fn get_exercises_handler(verifier: web::Data<Verifier>) -> impl Responder {
    let exercises: Vec<ExerciseView> = verifier
        .catalog()
        .exercises()
        .iter()
        .map(ExerciseView::from)
        .collect();
    HttpResponse::Ok().json(exercises)
}

#[get("/exercises/{id}")]
pub async fn get_exercise_by_id_handler(
    verifier: web::Data<Verifier>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    match verifier.catalog().get(&id) {
        Some(exercise) => HttpResponse::Ok().json(ExerciseView::from(exercise)),
        None => ErrorResponse::not_found(format!("Exercise '{id}' not found")),
    }
}
