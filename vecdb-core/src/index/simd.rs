#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Function pointer signature for high-speed distance computation.
pub type SimdFunc = unsafe fn(*const f32, *const f32, usize) -> f32;

/// The Reference Implementation: squared Euclidean distance.
///
/// # Safety
/// `a` and `b` must each be valid for `n` reads.
pub unsafe fn scalar_l2(a: *const f32, b: *const f32, n: usize) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..n {
        let diff = (*a.add(i)) - (*b.add(i));
        acc += diff * diff;
    }
    acc
}

/// The AVX2 Intrinsic Kernel.
/// Uses 256-bit YMM registers and Fused Multiply-Add (FMA) on the difference vector.
///
/// # Safety
/// `a` and `b` must each be valid for `n` reads, and the CPU must support AVX2 and FMA.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn avx2_l2(a: *const f32, b: *const f32, n: usize) -> f32 {
    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();
    let mut acc2 = _mm256_setzero_ps();
    let mut acc3 = _mm256_setzero_ps();

    let mut i = 0;
    // 4 accumulators x 8 floats
    while i + 32 <= n {
        let d0 = _mm256_sub_ps(_mm256_loadu_ps(a.add(i)), _mm256_loadu_ps(b.add(i)));
        acc0 = _mm256_fmadd_ps(d0, d0, acc0);

        let d1 = _mm256_sub_ps(_mm256_loadu_ps(a.add(i + 8)), _mm256_loadu_ps(b.add(i + 8)));
        acc1 = _mm256_fmadd_ps(d1, d1, acc1);

        let d2 = _mm256_sub_ps(_mm256_loadu_ps(a.add(i + 16)), _mm256_loadu_ps(b.add(i + 16)));
        acc2 = _mm256_fmadd_ps(d2, d2, acc2);

        let d3 = _mm256_sub_ps(_mm256_loadu_ps(a.add(i + 24)), _mm256_loadu_ps(b.add(i + 24)));
        acc3 = _mm256_fmadd_ps(d3, d3, acc3);

        i += 32;
    }

    while i + 8 <= n {
        let d = _mm256_sub_ps(_mm256_loadu_ps(a.add(i)), _mm256_loadu_ps(b.add(i)));
        acc0 = _mm256_fmadd_ps(d, d, acc0);
        i += 8;
    }

    acc0 = _mm256_add_ps(acc0, acc1);
    acc2 = _mm256_add_ps(acc2, acc3);
    acc0 = _mm256_add_ps(acc0, acc2);

    // Horizontal Sum reduction to single f32
    let upper = _mm256_extractf128_ps(acc0, 1);
    let lower = _mm256_castps256_ps128(acc0);
    let sum128 = _mm_add_ps(upper, lower);
    let sum_h = _mm_hadd_ps(sum128, sum128);
    let final_vector = _mm_hadd_ps(sum_h, sum_h);

    let mut result = _mm_cvtss_f32(final_vector);

    // Tail (n % 8)
    while i < n {
        let diff = (*a.add(i)) - (*b.add(i));
        result += diff * diff;
        i += 1;
    }

    result
}

/// The Dispatcher. Picks the fastest squared-L2 kernel the running CPU supports.
pub fn get_l2_kernel() -> SimdFunc {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return avx2_l2;
        }
    }

    scalar_l2
}
