mod concurrency;
mod failure_modes;
mod freshness_lifecycle;
mod manual_mark;
mod retention;
