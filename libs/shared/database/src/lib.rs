pub mod supabase;

pub use supabase::{ConstraintViolation, SupabaseClient};
