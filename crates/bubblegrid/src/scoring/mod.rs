//! Bubble scoring, answer resolution, identifier decoding and key reading.

mod key_reader;
mod resolver;
mod scorer;
mod student_id;

pub use key_reader::{read_answer_key, read_key_choice, AnswerKeyReading};
pub use resolver::{
    grade, grade_questions, resolve_marks, round2, GradedSheet, MarkState, QuestionReading,
    QuestionStatus, Resolution, Tally,
};
pub use scorer::{fill_ratio_circular, fill_ratio_rect, score_question, BubbleScore, Roi};
pub use student_id::{decode_column, decode_student_id, score_column, DecodedId, ID_UNREADABLE};
