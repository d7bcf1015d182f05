use super::*;
use crate::foundation::core::Canvas;

fn solid(rgb: [u8; 3]) -> FrameRGBA {
    FrameRGBA::solid(Canvas::new(4, 2).unwrap(), rgb)
}

#[test]
fn crossfade_endpoints() {
    let a = [200, 100, 0, 255];
    let b = [0, 50, 250, 255];
    assert_eq!(crossfade(a, b, 0.0), a);
    assert_eq!(crossfade(a, b, 1.0), b);
    let mid = crossfade(a, b, 0.5);
    assert!(mid[0] > 90 && mid[0] < 110);
    assert_eq!(mid[3], 255);
}

#[test]
fn two_keyframes_at_30_fps_yield_15_frames() {
    let keys = [solid([0, 0, 0]), solid([255, 255, 255])];
    let frames = interpolate_frames(&keys, Fps::whole(30).unwrap()).unwrap();
    assert_eq!(frames.len(), 15);
    assert_eq!(frames[0], keys[0]);
    let reds: Vec<u8> = frames.iter().map(|f| f.data[0]).collect();
    assert!(reds.windows(2).all(|w| w[1] >= w[0]));
    assert!(reds[14] < 255);
}

#[test]
fn frame_count_scales_with_pairs() {
    let keys = [solid([0, 0, 0]), solid([10, 0, 0]), solid([20, 0, 0])];
    let frames = interpolate_frames(&keys, Fps::whole(25).unwrap()).unwrap();
    assert_eq!(frames.len(), 2 * 12);
    assert_eq!(frames[12], keys[1]);
}

#[test]
fn fewer_than_two_keyframes_is_invalid() {
    let fps = Fps::whole(30).unwrap();
    assert!(interpolate_frames(&[], fps).unwrap_err().is_validation());
    assert!(
        interpolate_frames(&[solid([1, 2, 3])], fps)
            .unwrap_err()
            .is_validation()
    );
}

#[test]
fn mismatched_keyframes_are_invalid() {
    let other = FrameRGBA::solid(Canvas::new(2, 2).unwrap(), [0, 0, 0]);
    let err = interpolate_frames(&[solid([0, 0, 0]), other], Fps::whole(30).unwrap()).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn one_fps_produces_no_frames() {
    let keys = [solid([0, 0, 0]), solid([255, 255, 255])];
    assert!(
        interpolate_frames(&keys, Fps::whole(1).unwrap())
            .unwrap()
            .is_empty()
    );
}
