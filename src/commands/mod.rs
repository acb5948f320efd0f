mod review_cmd;

pub use review_cmd::run_review;
