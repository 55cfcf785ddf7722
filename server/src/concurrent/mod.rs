pub mod thread_pools;
pub mod work_queue;
