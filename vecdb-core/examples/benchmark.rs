use std::time::Instant;
use vecdb_core::index::simd;

fn main() {
    let n = 128; // Standard dimension
    let iterations = 10_000_000;

    let v1 = vec![1.2f32; n];
    let v2 = vec![0.8f32; n];

    println!("Benchmarking f32 squared L2 ({} iterations)...", iterations);
    let start_scalar = Instant::now();
    let mut sum_scalar = 0.0;
    for _ in 0..iterations {
        unsafe {
            sum_scalar += simd::scalar_l2(v1.as_ptr(), v2.as_ptr(), n);
        }
    }
    let duration_scalar = start_scalar.elapsed();
    println!("Scalar: {:?} (Dummy sum: {})", duration_scalar, sum_scalar);

    println!("Benchmarking dispatched kernel...");
    let kernel = simd::get_l2_kernel();
    let start_dispatch = Instant::now();
    let mut sum_dispatch = 0.0;
    for _ in 0..iterations {
        unsafe {
            sum_dispatch += kernel(v1.as_ptr(), v2.as_ptr(), n);
        }
    }
    let duration_dispatch = start_dispatch.elapsed();
    println!("Dispatched: {:?} (Dummy sum: {})", duration_dispatch, sum_dispatch);

    println!(
        "\nSummary Speedup (Dispatched vs Scalar): {:.2}x",
        duration_scalar.as_secs_f64() / duration_dispatch.as_secs_f64()
    );
}
